//! Dashkit runtime - the dashboard command loop
//!
//! Commands are enqueued on an unbounded channel and processed one at a
//! time by the root command handler, which owns the state store. Each
//! command produces a `CommandStarted` event and exactly one terminal
//! event, published synchronously to subscribers.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dashkit_model::commands;
//! use dashkit_model::model::ObjRef;
//! use dashkit_runtime::{Dashboard, DashboardContext, InMemoryBackend};
//!
//! # async fn demo() -> Result<(), dashkit_runtime::CommandError> {
//! let ctx = DashboardContext::new(Arc::new(InMemoryBackend::new()), "workspace");
//! let dashboard = Dashboard::start(ctx);
//! dashboard.subscribe(|event| println!("{}", event.event_type()));
//!
//! dashboard
//!     .dispatch_and_wait(commands::initialize(ObjRef::id("dashboard.sales")))
//!     .await?;
//! dashboard.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod abandon;
pub mod backend;
pub mod channel;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod dispatcher;
pub mod envelope;
pub mod errors;
pub mod handlers;
pub mod root_handler;

pub use abandon::{AbandonRegistry, AbandonToken};
pub use backend::{
    BackendError, BackendOp, DashboardBackend, InMemoryBackend, PagedQuery, PagedResult,
};
pub use channel::{command_channel, CommandReceiver, CommandSender};
pub use config::{ConfigError, DashboardSettings, RuntimeConfig};
pub use context::DashboardContext;
pub use dashboard::{Dashboard, PreloadOutcome};
pub use dispatcher::{EventDispatcher, SubscriptionId};
pub use envelope::{CommandEnvelope, ReplyReceiver};
pub use errors::{CommandError, HandlerError};
pub use root_handler::LoopPhase;

//! Dashboard domain model, commands, events and state
//!
//! This crate holds everything about a dashboard that does not need an
//! async runtime: the backend-agnostic data model, the closed command and
//! event vocabularies with their JSON wire shapes, the slice reducers and
//! the [`state::StateStore`] that applies them atomically.
//!
//! ## Error Facility
//!
//! Domain errors are [`errors::DashboardError`]; they convert into the
//! canonical [`errors::ExError`] whose stable `ERR_*` codes are used by the
//! logging macros.


pub mod commands;
pub mod errors;
pub mod events;
pub mod logging_facility;
pub mod model;
pub mod selectors;
pub mod state;

pub use dashkit_core_types::schema;

pub use commands::{CommandPayload, DashboardCommand};
pub use errors::{DashboardError, ExError, ExErrorKind, Result};
pub use events::{CommandFailure, DashboardEvent, EventContext, EventPayload, FailureReason};
pub use state::{DashboardAction, DashboardState, StateStore};

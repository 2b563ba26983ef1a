//! Dashboard handle: the public face of one running dashboard

use std::sync::Arc;

use dashkit_core_types::{CorrelationId, EnvelopeId};
use dashkit_model::commands::{self, DashboardCommand};
use dashkit_model::events::DashboardEvent;
use dashkit_model::model::ObjRef;
use dashkit_model::state::{DashboardState, StateStore};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::abandon::AbandonRegistry;
use crate::backend::BackendError;
use crate::channel::{command_channel, CommandSender};
use crate::context::DashboardContext;
use crate::dispatcher::{EventDispatcher, SubscriptionId};
use crate::envelope::CommandEnvelope;
use crate::errors::CommandError;
use crate::root_handler::{LoopPhase, RootCommandHandler};

const PRELOAD_KEY: &str = "preload";

/// Result of a background preload
#[derive(Debug, Clone, PartialEq)]
pub enum PreloadOutcome {
    /// The loaded definition was sent as an INITIALIZE command
    Dispatched(EnvelopeId),
    /// Superseded or abandoned; the loaded definition was dropped
    Abandoned,
    Failed(BackendError),
    RuntimeGone,
}

/// Handle to a running dashboard runtime
///
/// Owns the sending side of the command channel. The command loop stops
/// once the handle (and any preload still holding a sender) is gone.
pub struct Dashboard {
    ctx: DashboardContext,
    sender: CommandSender,
    dispatcher: EventDispatcher,
    state_rx: watch::Receiver<Arc<DashboardState>>,
    phase_rx: watch::Receiver<LoopPhase>,
    abandon: AbandonRegistry,
    loop_task: JoinHandle<()>,
}

impl Dashboard {
    /// Start a runtime with empty state
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn start(ctx: DashboardContext) -> Self {
        Self::start_with_state(ctx, DashboardState::default())
    }

    /// Start a runtime from an existing state
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn start_with_state(ctx: DashboardContext, initial: DashboardState) -> Self {
        let dispatcher = EventDispatcher::new(ctx.settings.event_buffer);
        let (sender, receiver) = command_channel();
        let (state_tx, state_rx) = watch::channel(Arc::new(initial.clone()));
        let (phase_tx, phase_rx) = watch::channel(LoopPhase::Idle);

        let root = RootCommandHandler::new(
            ctx.clone(),
            StateStore::new(initial),
            dispatcher.clone(),
            state_tx,
            phase_tx,
        );
        let loop_task = tokio::spawn(root.run(receiver));
        tracing::info!(workspace = ctx.workspace.as_str(), "Dashboard runtime started");

        Self {
            ctx,
            sender,
            dispatcher,
            state_rx,
            phase_rx,
            abandon: AbandonRegistry::new(),
            loop_task,
        }
    }

    pub fn context(&self) -> &DashboardContext {
        &self.ctx
    }

    /// Enqueue a command or an envelope without waiting for it
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::RuntimeGone`] when the loop has stopped.
    pub fn dispatch(&self, envelope: impl Into<CommandEnvelope>) -> Result<EnvelopeId, CommandError> {
        self.sender.dispatch(envelope)
    }

    /// Enqueue a command and wait for its terminal event
    ///
    /// # Errors
    ///
    /// Returns the command's failure, rejection or internal error, or
    /// [`CommandError::RuntimeGone`] when the loop stopped before settling it.
    pub async fn dispatch_and_wait(
        &self,
        command: DashboardCommand,
    ) -> Result<DashboardEvent, CommandError> {
        let (envelope, reply) = CommandEnvelope::with_reply(command);
        self.sender.dispatch(envelope)?;
        reply.await.map_err(|_| CommandError::RuntimeGone)?
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&DashboardEvent) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    /// Async stream of events dispatched after this call
    pub fn event_stream(&self) -> broadcast::Receiver<DashboardEvent> {
        self.dispatcher.event_stream()
    }

    /// State as of the last settled command
    pub fn state(&self) -> Arc<DashboardState> {
        Arc::clone(&self.state_rx.borrow())
    }

    pub fn state_changes(&self) -> watch::Receiver<Arc<DashboardState>> {
        self.state_rx.clone()
    }

    pub fn phase(&self) -> LoopPhase {
        *self.phase_rx.borrow()
    }

    /// Load a dashboard in the background and initialize from it
    ///
    /// A newer preload, or [`Dashboard::abandon_preload`], makes this one
    /// drop its result instead of dispatching it. The backend call itself
    /// is never interrupted.
    pub fn preload(&self, dashboard_ref: ObjRef) -> JoinHandle<PreloadOutcome> {
        let token = self.abandon.begin(PRELOAD_KEY);
        let registry = self.abandon.clone();
        let backend = Arc::clone(&self.ctx.backend);
        let sender = self.sender.clone();

        tokio::spawn(async move {
            let loaded = backend.load_dashboard(&dashboard_ref).await;
            if token.is_abandoned() {
                tracing::debug!(dashboard = %dashboard_ref, "Preload result ignored");
                return PreloadOutcome::Abandoned;
            }
            registry.finish(&token);

            match loaded {
                Ok(definition) => {
                    let command = commands::initialize_with_definition(definition)
                        .with_correlation_id(CorrelationId::generate());
                    match sender.dispatch(command) {
                        Ok(id) => PreloadOutcome::Dispatched(id),
                        Err(_) => PreloadOutcome::RuntimeGone,
                    }
                }
                Err(err) => {
                    tracing::warn!(dashboard = %dashboard_ref, error = %err, "Preload failed");
                    PreloadOutcome::Failed(err)
                }
            }
        })
    }

    /// Returns `true` when a preload was running
    pub fn abandon_preload(&self) -> bool {
        self.abandon.abandon(PRELOAD_KEY)
    }

    /// Stop accepting commands and wait for the queued ones to settle
    pub async fn shutdown(self) {
        let Self {
            sender, loop_task, ..
        } = self;
        drop(sender);
        if let Err(err) = loop_task.await {
            tracing::error!(error = %err, "Command loop terminated abnormally");
        }
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("ctx", &self.ctx)
            .field("phase", &self.phase())
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

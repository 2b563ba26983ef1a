//! Root command handler: the single consumer of the command channel
//!
//! Processes one envelope at a time. Every command yields a
//! `CommandStarted` event followed by exactly one terminal event, whatever
//! the handler or the callbacks do.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use dashkit_core_types::EnvelopeId;
use dashkit_model::commands::DashboardCommand;
use dashkit_model::errors::{ExError, ExErrorKind};
use dashkit_model::events::{DashboardEvent, EventPayload};
use dashkit_model::state::{DashboardState, StateStore};
use dashkit_model::{log_op_end, log_op_error, log_op_start};
use futures::FutureExt;
use tokio::sync::watch;
use tracing::Instrument;

use crate::channel::CommandReceiver;
use crate::context::DashboardContext;
use crate::dispatcher::{panic_message, EventDispatcher};
use crate::envelope::{CommandEnvelope, EnvelopeCallbacks};
use crate::errors::{CommandError, HandlerError};
use crate::handlers::{self, HandlerScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Idle,
    Processing,
    /// The last command ended with a failure or an internal error
    Error,
}

pub(crate) struct RootCommandHandler {
    ctx: DashboardContext,
    store: StateStore,
    dispatcher: EventDispatcher,
    state_tx: watch::Sender<Arc<DashboardState>>,
    phase_tx: watch::Sender<LoopPhase>,
}

impl RootCommandHandler {
    pub(crate) fn new(
        ctx: DashboardContext,
        store: StateStore,
        dispatcher: EventDispatcher,
        state_tx: watch::Sender<Arc<DashboardState>>,
        phase_tx: watch::Sender<LoopPhase>,
    ) -> Self {
        Self {
            ctx,
            store,
            dispatcher,
            state_tx,
            phase_tx,
        }
    }

    /// Run until every command sender is dropped
    pub(crate) async fn run(mut self, mut commands: CommandReceiver) {
        tracing::debug!(workspace = self.ctx.workspace.as_str(), "Command loop started");
        while let Some(envelope) = commands.recv().await {
            self.process(envelope).await;
        }
        tracing::debug!(
            workspace = self.ctx.workspace.as_str(),
            version = self.store.version(),
            "Command loop stopped"
        );
    }

    async fn process(&mut self, envelope: CommandEnvelope) {
        let (envelope_id, command, callbacks) = envelope.into_parts();
        let span = tracing::info_span!(
            "command",
            command_type = command.command_type(),
            correlation_id = command.correlation_label(),
            envelope_id = %envelope_id,
        );
        self.process_command(envelope_id, command, callbacks)
            .instrument(span)
            .await;
    }

    async fn process_command(
        &mut self,
        envelope_id: EnvelopeId,
        command: DashboardCommand,
        callbacks: EnvelopeCallbacks,
    ) {
        let started = Instant::now();
        let command_type = command.command_type().to_string();
        let correlation = command.correlation_label().to_string();
        let version_before = self.store.version();

        self.set_phase(LoopPhase::Processing);
        log_op_start!(
            command_type.as_str(),
            correlation_id = correlation.as_str(),
            envelope_id = %envelope_id
        );

        let started_event = self.event(
            &command,
            EventPayload::CommandStarted {
                command: command.clone(),
            },
        );
        self.dispatcher.dispatch(&started_event);
        run_callback("onStart", &command, callbacks.on_start, &command);

        let outcome = {
            let mut scope =
                HandlerScope::new(&self.ctx, &mut self.store, &self.dispatcher, &command);
            AssertUnwindSafe(handlers::handle_command(&mut scope, &command))
                .catch_unwind()
                .await
        };

        // Readers see the new state before the terminal event goes out
        if self.store.version() != version_before {
            self.state_tx.send_replace(self.store.snapshot());
        }

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match self.settle(&command, outcome, duration_ms) {
            Ok(event) => {
                self.dispatcher.dispatch(&event);
                self.set_phase(LoopPhase::Idle);
                run_callback("onSuccess", &command, callbacks.on_success, &event);
            }
            Err((event, err)) => {
                self.dispatcher.dispatch(&event);
                self.set_phase(LoopPhase::Error);
                run_callback("onError", &command, callbacks.on_error, &err);
                self.set_phase(LoopPhase::Idle);
            }
        }
    }

    /// Turn the handler outcome into the terminal event
    fn settle(
        &self,
        command: &DashboardCommand,
        outcome: std::thread::Result<Result<DashboardEvent, HandlerError>>,
        duration_ms: u64,
    ) -> Result<DashboardEvent, (DashboardEvent, CommandError)> {
        let command_type = command.command_type().to_string();
        match outcome {
            Ok(Ok(event)) if event.is_terminal() => {
                log_op_end!(
                    command_type.as_str(),
                    duration_ms = duration_ms,
                    event_type = event.event_type()
                );
                Ok(event)
            }
            Ok(Ok(event)) => {
                let ex = ExError::new(ExErrorKind::InvariantViolation).with_message(format!(
                    "handler returned non-terminal event {}",
                    event.event_type()
                ));
                Err(self.internal_error(command, ex, duration_ms))
            }
            // The fallback settles normally; its outcome is the rejection event
            Ok(Err(HandlerError::Rejected)) => {
                let event = self.event(
                    command,
                    EventPayload::CommandRejected {
                        command_type: command_type.clone(),
                    },
                );
                log_op_end!(
                    command_type.as_str(),
                    duration_ms = duration_ms,
                    event_type = event.event_type()
                );
                Ok(event)
            }
            Ok(Err(HandlerError::Failed(failure))) => {
                log_op_error!(
                    command_type.as_str(),
                    HandlerError::Failed(failure.clone()),
                    duration_ms = duration_ms
                );
                let event = self.event(command, EventPayload::CommandFailed(failure.clone()));
                Err((event, CommandError::Failed(failure)))
            }
            Ok(Err(err)) => {
                let ex = ExError::from(err).with_command_type(command_type.as_str());
                Err(self.internal_error(command, ex, duration_ms))
            }
            Err(panic) => {
                let ex = ExError::new(ExErrorKind::Internal)
                    .with_command_type(command_type.as_str())
                    .with_message(format!(
                        "handler panicked: {}",
                        panic_message(panic.as_ref())
                    ));
                Err(self.internal_error(command, ex, duration_ms))
            }
        }
    }

    fn internal_error(
        &self,
        command: &DashboardCommand,
        cause: ExError,
        duration_ms: u64,
    ) -> (DashboardEvent, CommandError) {
        let command_type = command.command_type().to_string();
        let error_code = cause.code().to_string();
        log_op_error!(command_type.as_str(), cause, duration_ms = duration_ms);

        let message = format!("Internal error has occurred while handling {}", command_type);
        let event = self.event(
            command,
            EventPayload::InternalError {
                command_type: command_type.clone(),
                message: message.clone(),
                error_code: Some(error_code),
            },
        );
        (
            event,
            CommandError::Internal {
                command_type,
                message,
            },
        )
    }

    fn event(&self, command: &DashboardCommand, payload: EventPayload) -> DashboardEvent {
        DashboardEvent::new(
            self.ctx
                .event_context(self.store.state().meta.dashboard_ref.as_ref()),
            command.correlation_id.clone(),
            payload,
        )
    }

    fn set_phase(&self, phase: LoopPhase) {
        self.phase_tx.send_if_modified(|current| {
            if *current == phase {
                return false;
            }
            tracing::trace!(from = ?current, to = ?phase, "Loop phase changed");
            *current = phase;
            true
        });
    }
}

/// Invoke an envelope callback, logging and swallowing its errors and panics
fn run_callback<T: ?Sized>(
    name: &str,
    command: &DashboardCommand,
    callback: Option<Box<dyn FnOnce(&T) -> anyhow::Result<()> + Send>>,
    arg: &T,
) {
    let Some(callback) = callback else {
        return;
    };
    let problem = match catch_unwind(AssertUnwindSafe(|| callback(arg))) {
        Ok(Ok(())) => return,
        Ok(Err(err)) => format!("{:#}", err),
        Err(panic) => format!("panic: {}", panic_message(panic.as_ref())),
    };
    let ex = ExError::new(ExErrorKind::Callback).with_message(problem.as_str());
    tracing::warn!(
        err.code = ex.code(),
        callback = name,
        error = problem.as_str(),
        "An error has occurred while calling {} function provided for {}@{} processing",
        name,
        command.command_type(),
        command.correlation_label()
    );
}

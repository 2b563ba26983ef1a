//! Runtime error types
//!
//! [`HandlerError`] is what command handlers return; the root command
//! handler turns it into exactly one terminal event. [`CommandError`] is
//! what callers see through `on_error` and `dispatch_and_wait`. A rejected
//! command is not an error for its caller: it settles through `on_success`
//! with the `CommandRejected` event.

use dashkit_model::errors::{DashboardError, ExError, ExErrorKind};
use dashkit_model::events::CommandFailure;
use thiserror::Error;

use crate::backend::BackendError;

/// Outcome of a handler that did not produce its success event
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Recognized failure, published unchanged as `CommandFailed`
    #[error(transparent)]
    Failed(CommandFailure),

    /// No handler processes the command; published as `CommandRejected`
    #[error("command has no handler")]
    Rejected,

    /// Backend I/O failed; published as `InternalError`
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// A reducer refused an action the handler had validated
    #[error("state error: {0}")]
    State(#[from] DashboardError),

    #[error("{0}")]
    Internal(String),
}

impl From<HandlerError> for ExError {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::Failed(failure) => {
                let fallback = if failure.is_user_error() {
                    ExErrorKind::InvalidInput
                } else {
                    ExErrorKind::Internal
                };
                let kind = failure
                    .error_code
                    .as_deref()
                    .and_then(ExErrorKind::from_code)
                    .unwrap_or(fallback);
                ExError::new(kind)
                    .with_command_type(failure.command_type)
                    .with_message(failure.message)
            }
            HandlerError::Rejected => ExError::new(ExErrorKind::UnknownCommand)
                .with_message("No handler registered for command"),
            HandlerError::Backend(e) => ExError::from(e),
            HandlerError::State(e) => ExError::from(e),
            HandlerError::Internal(message) => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

/// Error reported to the issuer of a command
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Failed(CommandFailure),

    #[error("internal error while handling {command_type}: {message}")]
    Internal {
        command_type: String,
        message: String,
    },

    /// The command loop is no longer running
    #[error("dashboard runtime has stopped")]
    RuntimeGone,
}

impl CommandError {
    pub fn is_user_error(&self) -> bool {
        matches!(self, CommandError::Failed(f) if f.is_user_error())
    }
}

impl From<CommandError> for ExError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Failed(failure) => HandlerError::Failed(failure).into(),
            CommandError::Internal {
                command_type,
                message,
            } => ExError::new(ExErrorKind::Internal)
                .with_command_type(command_type)
                .with_message(message),
            CommandError::RuntimeGone => ExError::new(ExErrorKind::RuntimeGone)
                .with_message("Dashboard runtime has stopped"),
        }
    }
}

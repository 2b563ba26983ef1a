//! Command envelope: a command plus its lifecycle callbacks
//!
//! Callbacks run on the command loop and are isolated: an error or a panic
//! inside one is logged and never affects the command or the loop.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use dashkit_core_types::EnvelopeId;
use dashkit_model::commands::DashboardCommand;
use dashkit_model::events::DashboardEvent;
use tokio::sync::oneshot;

use crate::errors::CommandError;

pub type OnStart = Box<dyn FnOnce(&DashboardCommand) -> anyhow::Result<()> + Send>;
pub type OnSuccess = Box<dyn FnOnce(&DashboardEvent) -> anyhow::Result<()> + Send>;
pub type OnError = Box<dyn FnOnce(&CommandError) -> anyhow::Result<()> + Send>;

/// Receiver resolved with the terminal outcome of an enveloped command
pub type ReplyReceiver = oneshot::Receiver<Result<DashboardEvent, CommandError>>;

pub struct CommandEnvelope {
    id: EnvelopeId,
    command: DashboardCommand,
    callbacks: EnvelopeCallbacks,
}

/// Callbacks taken out of an envelope by the command loop
#[derive(Default)]
pub struct EnvelopeCallbacks {
    pub on_start: Option<OnStart>,
    pub on_success: Option<OnSuccess>,
    pub on_error: Option<OnError>,
}

impl CommandEnvelope {
    pub fn new(command: DashboardCommand) -> Self {
        Self {
            id: EnvelopeId::new(),
            command,
            callbacks: EnvelopeCallbacks::default(),
        }
    }

    /// Envelope whose success and error callbacks resolve the returned receiver
    pub fn with_reply(command: DashboardCommand) -> (Self, ReplyReceiver) {
        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(Mutex::new(Some(tx)));
        let error_slot = Arc::clone(&slot);

        let envelope = Self::new(command)
            .on_success(move |event| {
                if let Some(tx) = take_sender(&slot) {
                    let _ = tx.send(Ok(event.clone()));
                }
                Ok(())
            })
            .on_error(move |err| {
                if let Some(tx) = take_sender(&error_slot) {
                    let _ = tx.send(Err(err.clone()));
                }
                Ok(())
            });
        (envelope, rx)
    }

    pub fn on_start<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&DashboardCommand) -> anyhow::Result<()> + Send + 'static,
    {
        self.callbacks.on_start = Some(Box::new(f));
        self
    }

    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&DashboardEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.callbacks.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&CommandError) -> anyhow::Result<()> + Send + 'static,
    {
        self.callbacks.on_error = Some(Box::new(f));
        self
    }

    pub fn id(&self) -> EnvelopeId {
        self.id
    }

    pub fn command(&self) -> &DashboardCommand {
        &self.command
    }

    pub fn into_parts(self) -> (EnvelopeId, DashboardCommand, EnvelopeCallbacks) {
        (self.id, self.command, self.callbacks)
    }
}

type ReplySlot = Mutex<Option<oneshot::Sender<Result<DashboardEvent, CommandError>>>>;

fn take_sender(
    slot: &ReplySlot,
) -> Option<oneshot::Sender<Result<DashboardEvent, CommandError>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

impl From<DashboardCommand> for CommandEnvelope {
    fn from(command: DashboardCommand) -> Self {
        Self::new(command)
    }
}

impl fmt::Debug for CommandEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEnvelope")
            .field("id", &self.id)
            .field("command_type", &self.command.command_type())
            .field("has_on_start", &self.callbacks.on_start.is_some())
            .field("has_on_success", &self.callbacks.on_success.is_some())
            .field("has_on_error", &self.callbacks.on_error.is_some())
            .finish()
    }
}

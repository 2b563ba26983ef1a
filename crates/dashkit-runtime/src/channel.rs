//! Command channel feeding the root command handler
//!
//! Unbounded and FIFO: nothing is dropped, reordered or prioritised.

use dashkit_core_types::EnvelopeId;
use tokio::sync::mpsc;

use crate::envelope::CommandEnvelope;
use crate::errors::CommandError;

#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<CommandEnvelope>,
}

#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::UnboundedReceiver<CommandEnvelope>,
}

pub fn command_channel() -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandSender { tx }, CommandReceiver { rx })
}

impl CommandSender {
    /// Enqueue a command or an envelope
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::RuntimeGone`] when the loop has stopped.
    pub fn dispatch(&self, envelope: impl Into<CommandEnvelope>) -> Result<EnvelopeId, CommandError> {
        let envelope = envelope.into();
        let id = envelope.id();
        self.tx
            .send(envelope)
            .map_err(|_| CommandError::RuntimeGone)?;
        Ok(id)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl CommandReceiver {
    /// Next envelope; `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<CommandEnvelope> {
        self.rx.recv().await
    }
}

//! Conversation controller
//!
//! The public handle validates input and forwards commands to a single
//! runtime task, which owns the session state and is the only place folds
//! happen. Observers read state through a watch channel.

mod runtime;

#[cfg(test)]
pub mod testing;

use crate::config::ClientConfig;
use crate::state_machine::{SessionState, TransitionError};
use crate::stream::EventSource;
use runtime::SessionRuntime;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Why a submission was not started
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Question is empty")]
    EmptyInput,
    #[error("A response is already streaming (cancel it first)")]
    Busy,
    #[error("Conversation has shut down")]
    Closed,
}

impl From<TransitionError> for SubmitError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::SessionBusy => SubmitError::Busy,
        }
    }
}

/// Commands sent from the handle to the runtime task
#[derive(Debug)]
pub(crate) enum Command {
    Submit {
        question: String,
        reply: oneshot::Sender<Result<(), SubmitError>>,
    },
    Cancel {
        reply: oneshot::Sender<()>,
    },
}

/// Trim and bound raw input. Truncation happens on a character boundary.
pub fn validate_question(raw: &str, max_chars: usize) -> Result<String, SubmitError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SubmitError::EmptyInput);
    }
    if trimmed.chars().nth(max_chars).is_some() {
        tracing::debug!(max_chars, "Truncating oversized question");
        return Ok(trimmed.chars().take(max_chars).collect());
    }
    Ok(trimmed.to_string())
}

/// Handle to one conversation.
///
/// Dropping the handle stops the runtime task, which cancels any in-flight
/// stream.
pub struct ConversationController {
    command_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<SessionState>,
    max_input_chars: usize,
    task: JoinHandle<()>,
}

impl ConversationController {
    /// Start a conversation. Must be called from within a tokio runtime.
    pub fn new<E>(source: E, config: &ClientConfig) -> Self
    where
        E: EventSource + 'static,
    {
        let initial = match &config.greeting {
            Some(greeting) => SessionState::with_greeting(greeting.clone()),
            None => SessionState::new(),
        };

        let (command_tx, command_rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(initial.clone());

        let runtime = SessionRuntime::new(initial, source, command_rx, state_tx, config.idle_timeout);
        let task = tokio::spawn(runtime.run());

        Self {
            command_tx,
            state_rx,
            max_input_chars: config.max_input_chars,
            task,
        }
    }

    /// Start streaming an answer to `raw_input`.
    ///
    /// Returns once the submission is accepted or rejected; the answer
    /// arrives through [`subscribe`](Self::subscribe). Empty input is
    /// rejected without touching the state or the network.
    pub async fn submit(&self, raw_input: &str) -> Result<(), SubmitError> {
        let question = validate_question(raw_input, self.max_input_chars)?;

        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(Command::Submit { question, reply })
            .await
            .map_err(|_| SubmitError::Closed)?;
        rx.await.map_err(|_| SubmitError::Closed)?
    }

    /// Abandon the in-flight answer, if any. Safe to call while idle.
    pub async fn cancel(&self) {
        let (reply, rx) = oneshot::channel();
        if self.command_tx.send(Command::Cancel { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Latest-value stream of session state
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state_rx.borrow().is_busy()
    }

    /// Stop the runtime task and wait for it to release its stream
    pub async fn shutdown(self) {
        let Self { command_tx, task, .. } = self;
        drop(command_tx);
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Conversation runtime panicked");
        }
    }
}

//! Wire and event types for the answering service

use serde::{Deserialize, Serialize};

/// Outbound request body: `{"question": "...", "history": [["q", "a"], ...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    /// `(question, answer)` pairs, oldest first
    pub history: Vec<(String, String)>,
}

impl ChatRequest {
    pub fn new(question: impl Into<String>, history: Vec<(String, String)>) -> Self {
        Self {
            question: question.into(),
            history,
        }
    }
}

/// Application events decoded from the response stream, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// One chunk of the answer
    Token(String),
    /// No more tokens will arrive
    Completed,
    /// Connection failed or the service answered with a non-success status
    TransportError(String),
    /// A frame payload could not be decoded
    ParseError(String),
}

impl StreamEvent {
    /// Check if no further events follow this one
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Token(_))
    }
}

/// Payload of a data frame
#[derive(Debug, Deserialize)]
pub(crate) struct TokenFrame {
    pub data: String,
}

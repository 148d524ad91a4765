//! Stream error types

use thiserror::Error;

/// Stream error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StreamError {
    pub kind: StreamErrorKind,
    pub message: String,
}

impl StreamError {
    pub fn new(kind: StreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Timeout, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Decode, message)
    }

    /// Non-success response. Keeps the start of the body for diagnostics.
    pub fn status(status: reqwest::StatusCode, body: &str) -> Self {
        let snippet: String = body.trim().chars().take(MAX_BODY_SNIPPET).collect();
        let message = if snippet.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {snippet}")
        };
        Self::new(StreamErrorKind::Status, message)
    }

    /// Check if this is a decode failure rather than a transport failure
    pub fn is_decode(&self) -> bool {
        self.kind == StreamErrorKind::Decode
    }
}

impl From<reqwest::Error> for StreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(e.to_string())
        } else if e.is_decode() {
            Self::decode(e.to_string())
        } else {
            Self::network(e.to_string())
        }
    }
}

const MAX_BODY_SNIPPET: usize = 200;

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    /// Non-success HTTP status
    Status,
    /// Connection refused, reset, or dropped mid-stream
    Network,
    /// Connect or idle timeout
    Timeout,
    /// Malformed frame payload or framing
    Decode,
}

//! Events that can occur in a session

use crate::stream::StreamEvent;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // User events
    SubmitStarted {
        question: String,
    },
    CancelRequested,

    // Stream events
    Token {
        fragment: String,
    },
    /// The stream finished. Carries the question the controller remembered
    /// for the in-flight submission.
    Completed {
        question: String,
    },
    TransportError {
        detail: String,
    },
    ParseError {
        detail: String,
    },
}

impl Event {
    /// Translate an adapter event for the stream that was opened for `question`
    pub fn from_stream(event: StreamEvent, question: &str) -> Self {
        match event {
            StreamEvent::Token(fragment) => Event::Token { fragment },
            StreamEvent::Completed => Event::Completed {
                question: question.to_string(),
            },
            StreamEvent::TransportError(detail) => Event::TransportError { detail },
            StreamEvent::ParseError(detail) => Event::ParseError { detail },
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::SubmitStarted { .. } => "submit_started",
            Event::CancelRequested => "cancel_requested",
            Event::Token { .. } => "token",
            Event::Completed { .. } => "completed",
            Event::TransportError { .. } => "transport_error",
            Event::ParseError { .. } => "parse_error",
        }
    }
}

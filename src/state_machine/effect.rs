//! Effects produced by state transitions

use crate::stream::ChatRequest;

/// Effects to be executed by the controller after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a stream to the answering service
    OpenStream { request: ChatRequest },

    /// Release the in-flight stream, if any
    CloseStream,

    /// Publish the new state to observers
    PublishState,
}

impl Effect {
    pub fn open_stream(question: impl Into<String>, history: Vec<(String, String)>) -> Self {
        Effect::OpenStream {
            request: ChatRequest::new(question, history),
        }
    }
}

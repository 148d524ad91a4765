//! Session state types

use serde::{Deserialize, Serialize};

/// Greeting shown before the first question. Display only, never sent as context.
pub const DEFAULT_GREETING: &str = "Hi there! What do you want to know about Gravel Bikes?";

// ============================================================================
// Turns
// ============================================================================

/// A completed question/answer exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// The `(question, answer)` pair shape used on the wire
    pub fn to_pair(&self) -> (String, String) {
        (self.question.clone(), self.answer.clone())
    }
}

// ============================================================================
// Failures
// ============================================================================

/// Why the last streamed answer was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection failed, non-success status, or the stream ended early
    Transport,
    /// A frame could not be decoded
    Parse,
}

/// Record of the most recent failed stream, for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFailure {
    pub kind: FailureKind,
    pub detail: String,
}

// ============================================================================
// Session State
// ============================================================================

/// Canonical conversation state.
///
/// `busy` is not stored: a session is busy exactly when an answer is pending,
/// so there is no representable state with an idle session still holding
/// un-recorded answer text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Completed exchanges, oldest first
    pub history: Vec<Turn>,
    /// Answer text accumulated for the in-flight stream
    pub pending_answer: Option<String>,
    /// Set when a stream fails, cleared by the next submission
    #[serde(default)]
    pub last_failure: Option<SessionFailure>,
    /// Static greeting for the projection, not part of `history`
    #[serde(default)]
    pub greeting: Option<String>,
    /// Submissions accepted so far; tells one pending answer from the next
    #[serde(default)]
    pub submissions: u64,
}

impl SessionState {
    /// Initial state for a new conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial state seeded with a display greeting
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        Self {
            greeting: Some(greeting.into()),
            ..Self::default()
        }
    }

    /// Check if a stream is in flight
    pub fn is_busy(&self) -> bool {
        self.pending_answer.is_some()
    }

    /// History in the `(question, answer)` shape the answering service expects
    pub fn history_pairs(&self) -> Vec<(String, String)> {
        self.history.iter().map(Turn::to_pair).collect()
    }
}

//! Read-only projection of session state into display messages
//!
//! Presentation layers re-derive this list on every state change and never
//! mutate it.

use crate::state_machine::SessionState;
use serde::Serialize;

/// Who a message is from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    User,
    Assistant,
}

/// A display unit derived from session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub origin: Origin,
    pub text: String,
    /// True only for the assistant message that is still streaming
    pub is_live: bool,
}

impl Message {
    fn user(text: &str) -> Self {
        Self {
            origin: Origin::User,
            text: text.to_string(),
            is_live: false,
        }
    }

    fn assistant(text: &str, is_live: bool) -> Self {
        Self {
            origin: Origin::Assistant,
            text: text.to_string(),
            is_live,
        }
    }
}

/// Greeting, then each turn as a (user, assistant) pair, then the live answer
pub fn messages(state: &SessionState) -> Vec<Message> {
    let mut out = Vec::with_capacity(state.history.len() * 2 + 2);

    if let Some(greeting) = &state.greeting {
        out.push(Message::assistant(greeting, false));
    }

    for turn in &state.history {
        out.push(Message::user(&turn.question));
        out.push(Message::assistant(&turn.answer, false));
    }

    if let Some(pending) = &state.pending_answer {
        out.push(Message::assistant(pending, true));
    }

    out
}

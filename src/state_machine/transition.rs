//! Pure state transition function
//!
//! Every transition is a function of the current state and one event. No I/O
//! happens here; the controller executes the returned effects.

use super::state::{FailureKind, SessionFailure, SessionState, Turn};
use super::{Effect, Event};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A response is already streaming (cancel it first)")]
    SessionBusy,
}

/// Pure transition function.
///
/// Stream events that arrive while idle (after a cancel raced with an event
/// already in flight) are dropped: the state is returned unchanged with no
/// effects.
pub fn transition(state: &SessionState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state.pending_answer.as_ref(), event) {
        // ============================================================
        // Submission
        // ============================================================

        (None, Event::SubmitStarted { question }) => {
            let request = Effect::open_stream(question, state.history_pairs());
            let new_state = SessionState {
                pending_answer: Some(String::new()),
                last_failure: None,
                submissions: state.submissions + 1,
                ..state.clone()
            };
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::PublishState)
                .with_effect(request))
        }

        (Some(_), Event::SubmitStarted { .. }) => Err(TransitionError::SessionBusy),

        // ============================================================
        // Streaming
        // ============================================================

        (Some(pending), Event::Token { fragment }) => {
            let mut answer = String::with_capacity(pending.len() + fragment.len());
            answer.push_str(pending);
            answer.push_str(&fragment);
            let new_state = SessionState {
                pending_answer: Some(answer),
                ..state.clone()
            };
            Ok(TransitionResult::new(new_state).with_effect(Effect::PublishState))
        }

        // Append and clear happen in the same returned value
        (Some(pending), Event::Completed { question }) => {
            let mut history = state.history.clone();
            history.push(Turn::new(question, pending.clone()));
            let new_state = SessionState {
                history,
                pending_answer: None,
                ..state.clone()
            };
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::CloseStream)
                .with_effect(Effect::PublishState))
        }

        // ============================================================
        // Failure and cancellation: the partial answer never enters history
        // ============================================================

        (Some(_), Event::TransportError { detail }) => {
            Ok(discard(state, Some(failure(FailureKind::Transport, detail))))
        }

        (Some(_), Event::ParseError { detail }) => {
            Ok(discard(state, Some(failure(FailureKind::Parse, detail))))
        }

        (Some(_), Event::CancelRequested) => Ok(discard(state, None)),

        // ============================================================
        // Idle: stray stream events and repeated cancels are no-ops
        // ============================================================

        (
            None,
            Event::CancelRequested
            | Event::Token { .. }
            | Event::Completed { .. }
            | Event::TransportError { .. }
            | Event::ParseError { .. },
        ) => Ok(TransitionResult::new(state.clone())),
    }
}

/// Total fold over events: rejected transitions leave the state unchanged
pub fn fold(state: SessionState, event: Event) -> SessionState {
    match transition(&state, event) {
        Ok(result) => result.new_state,
        Err(_) => state,
    }
}

fn discard(state: &SessionState, last_failure: Option<SessionFailure>) -> TransitionResult {
    let new_state = SessionState {
        pending_answer: None,
        last_failure,
        ..state.clone()
    };
    TransitionResult::new(new_state)
        .with_effect(Effect::CloseStream)
        .with_effect(Effect::PublishState)
}

fn failure(kind: FailureKind, detail: String) -> SessionFailure {
    SessionFailure { kind, detail }
}

//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,?–]{0,20}"
}

fn arb_turn() -> impl Strategy<Value = Turn> {
    (arb_text(), arb_text()).prop_map(|(question, answer)| Turn { question, answer })
}

fn arb_history() -> impl Strategy<Value = Vec<Turn>> {
    proptest::collection::vec(arb_turn(), 0..5)
}

fn arb_idle_state() -> impl Strategy<Value = SessionState> {
    arb_history().prop_map(|history| SessionState {
        history,
        ..SessionState::default()
    })
}

fn arb_busy_state() -> impl Strategy<Value = SessionState> {
    (arb_history(), arb_text()).prop_map(|(history, pending)| SessionState {
        history,
        pending_answer: Some(pending),
        ..SessionState::default()
    })
}

fn arb_state() -> impl Strategy<Value = SessionState> {
    prop_oneof![arb_idle_state(), arb_busy_state()]
}

fn arb_failure_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_text().prop_map(|detail| Event::TransportError { detail }),
        arb_text().prop_map(|detail| Event::ParseError { detail }),
        Just(Event::CancelRequested),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_text().prop_map(|question| Event::SubmitStarted { question }),
        arb_text().prop_map(|fragment| Event::Token { fragment }),
        arb_text().prop_map(|question| Event::Completed { question }),
        arb_failure_event(),
    ]
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // answer is the exact concatenation of fragments, in order
    #[test]
    fn prop_tokens_concatenate_in_order(
        question in arb_text(),
        fragments in proptest::collection::vec(arb_text(), 0..20)
    ) {
        let mut state = fold(SessionState::new(), Event::SubmitStarted { question: question.clone() });
        for fragment in &fragments {
            state = fold(state, Event::Token { fragment: fragment.clone() });
        }
        state = fold(state, Event::Completed { question: question.clone() });

        prop_assert_eq!(state.history.len(), 1);
        prop_assert_eq!(&state.history[0].question, &question);
        prop_assert_eq!(&state.history[0].answer, &fragments.concat());
        prop_assert!(!state.is_busy());
    }

    // completion leaves the session idle with the answer recorded
    #[test]
    fn prop_completion_is_atomic(state in arb_busy_state(), question in arb_text()) {
        let pending = state.pending_answer.clone().unwrap_or_default();
        let before_len = state.history.len();

        let result = transition(&state, Event::Completed { question: question.clone() });
        prop_assert!(result.is_ok());
        let new_state = result.unwrap().new_state;

        prop_assert!(!new_state.is_busy());
        prop_assert_eq!(new_state.pending_answer, None);
        prop_assert_eq!(new_state.history.len(), before_len + 1);
        let expected = Turn { question, answer: pending };
        prop_assert_eq!(new_state.history.last(), Some(&expected));
    }

    // failures and cancellation never touch history
    #[test]
    fn prop_failure_discards_pending(state in arb_busy_state(), event in arb_failure_event()) {
        let result = transition(&state, event);
        prop_assert!(result.is_ok());
        let result = result.unwrap();

        prop_assert_eq!(&result.new_state.history, &state.history);
        prop_assert!(!result.new_state.is_busy());
        prop_assert!(
            result.effects.contains(&Effect::CloseStream),
            "Leaving the busy state should close the stream"
        );
    }

    // busy sessions reject a second submission
    #[test]
    fn prop_busy_rejects_submission(state in arb_busy_state(), question in arb_text()) {
        let result = transition(&state, Event::SubmitStarted { question });
        prop_assert!(matches!(result, Err(TransitionError::SessionBusy)));
    }

    // cancel is idempotent
    #[test]
    fn prop_cancel_idempotent(state in arb_state()) {
        let once = fold(state.clone(), Event::CancelRequested);
        let twice = fold(once.clone(), Event::CancelRequested);
        prop_assert_eq!(once, twice);
    }

    // History only ever grows by appending, whatever the event sequence
    #[test]
    fn prop_history_is_append_only(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut state = SessionState::new();
        for event in events {
            let before = state.history.clone();
            state = fold(state, event);
            prop_assert!(state.history.len() >= before.len());
            prop_assert!(state.history.len() <= before.len() + 1);
            prop_assert_eq!(&state.history[..before.len()], &before[..]);
        }
    }

    // Events delivered while idle are dropped without effects
    #[test]
    fn prop_idle_ignores_stream_events(state in arb_idle_state(), event in arb_event()) {
        if !matches!(event, Event::SubmitStarted { .. }) {
            let result = transition(&state, event).unwrap();
            prop_assert_eq!(&result.new_state, &state);
            prop_assert!(result.effects.is_empty());
        }
    }

    // PublishState accompanies every state change
    #[test]
    fn prop_state_changes_publish(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, event) {
            if result.new_state != state {
                prop_assert!(
                    result.effects.contains(&Effect::PublishState),
                    "State changed but no PublishState effect: {:?} -> {:?}",
                    state,
                    result.new_state
                );
            }
        }
    }

    // OpenStream only appears when entering the busy state
    #[test]
    fn prop_open_stream_only_on_submit(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, event) {
            let opens = result
                .effects
                .iter()
                .filter(|e| matches!(e, Effect::OpenStream { .. }))
                .count();
            if opens > 0 {
                prop_assert_eq!(opens, 1);
                prop_assert!(!state.is_busy());
                prop_assert!(result.new_state.is_busy());
            }
        }
    }
}

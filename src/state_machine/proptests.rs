//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::transition::*;
use super::*;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> UserContext {
    UserContext::new("test-user")
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_id() -> impl Strategy<Value = i64> {
    1i64..50
}

fn arb_state() -> impl Strategy<Value = PendingConversation> {
    prop_oneof![
        Just(PendingConversation::Idle),
        Just(PendingConversation::AwaitingNewQuestion),
        arb_id().prop_map(|question_id| PendingConversation::AwaitingNewAnswer { question_id }),
        arb_id().prop_map(|question_id| PendingConversation::AwaitingEditedQuestion { question_id }),
        arb_id().prop_map(|answer_id| PendingConversation::AwaitingEditedAnswer { answer_id }),
    ]
}

fn arb_pending_state() -> impl Strategy<Value = PendingConversation> {
    arb_state().prop_filter("must be pending", |s| !s.is_idle())
}

fn arb_begin_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::AskQuestion),
        arb_id().prop_map(|question_id| Event::EditQuestion { question_id }),
        arb_id().prop_map(|question_id| Event::AnswerQuestion { question_id }),
        arb_id().prop_map(|answer_id| Event::EditAnswer { answer_id }),
    ]
}

fn arb_text_event() -> impl Strategy<Value = Event> {
    "[a-zA-Z ?]{1,30}".prop_map(|text| Event::TextReceived { text })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![arb_begin_event(), arb_text_event()]
}

/// The state a begin event leads to
fn target_of(event: &Event) -> Option<PendingConversation> {
    match event {
        Event::AskQuestion => Some(PendingConversation::AwaitingNewQuestion),
        Event::EditQuestion { question_id } => Some(PendingConversation::AwaitingEditedQuestion {
            question_id: *question_id,
        }),
        Event::AnswerQuestion { question_id } => Some(PendingConversation::AwaitingNewAnswer {
            question_id: *question_id,
        }),
        Event::EditAnswer { answer_id } => Some(PendingConversation::AwaitingEditedAnswer {
            answer_id: *answer_id,
        }),
        Event::TextReceived { .. } => None,
    }
}

/// The submission a pending state turns `text` into
fn expected_submission(state: &PendingConversation, text: &str) -> Option<Submission> {
    let author = test_context().user_id;
    let text = text.to_string();
    match state {
        PendingConversation::Idle => None,
        PendingConversation::AwaitingNewQuestion => Some(Submission::NewQuestion { author, text }),
        PendingConversation::AwaitingNewAnswer { question_id } => Some(Submission::NewAnswer {
            question_id: *question_id,
            author,
            text,
        }),
        PendingConversation::AwaitingEditedQuestion { question_id } => {
            Some(Submission::EditedQuestion {
                question_id: *question_id,
                text,
            })
        }
        PendingConversation::AwaitingEditedAnswer { answer_id } => Some(Submission::EditedAnswer {
            answer_id: *answer_id,
            text,
        }),
    }
}

fn persist_count(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, Effect::Persist(_)))
        .count()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: text always resolves a pending conversation back to Idle
    #[test]
    fn prop_text_consumes_pending(state in arb_pending_state(), event in arb_text_event()) {
        let result = transition(&state, &test_context(), event).unwrap();
        prop_assert_eq!(result.new_state, PendingConversation::Idle);
        prop_assert_eq!(persist_count(&result.effects), 1);
    }

    // Invariant 2: Idle never accepts text
    #[test]
    fn prop_idle_rejects_text(event in arb_text_event()) {
        let result = transition(&PendingConversation::Idle, &test_context(), event);
        prop_assert_eq!(result.err(), Some(TransitionError::NothingPending));
    }

    // Invariant 3: starting a conversation works from any state and prompts once
    #[test]
    fn prop_begin_from_any_state(state in arb_state(), event in arb_begin_event()) {
        let target = target_of(&event).unwrap();
        let result = transition(&state, &test_context(), event).unwrap();

        prop_assert_eq!(&result.new_state, &target);
        prop_assert_eq!(persist_count(&result.effects), 0);
        prop_assert_eq!(
            result.effects.iter().filter(|e| matches!(e, Effect::SendText { .. })).count(),
            1
        );

        let discarded = result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::DiscardPending { previous } if *previous == state));
        prop_assert_eq!(discarded, !state.is_idle());
    }

    // Invariant 4: over any event sequence, each persisted submission comes
    // from the most recent begin event before the text, and nothing queues
    #[test]
    fn prop_only_latest_conversation_persists(events in proptest::collection::vec(arb_event(), 0..30)) {
        let ctx = test_context();
        let mut state = PendingConversation::Idle;
        let mut latest_begin: Option<PendingConversation> = None;

        for event in events {
            let text = match &event {
                Event::TextReceived { text } => Some(text.clone()),
                _ => None,
            };
            if let Some(target) = target_of(&event) {
                latest_begin = Some(target);
            }

            match transition(&state, &ctx, event) {
                Ok(result) => {
                    if let Some(text) = text {
                        let pending = latest_begin.take().unwrap();
                        let expected = expected_submission(&pending, &text).unwrap();
                        prop_assert_eq!(&result.effects, &vec![Effect::Persist(expected)]);
                    }
                    state = result.new_state;
                }
                Err(TransitionError::NothingPending) => {
                    prop_assert!(state.is_idle());
                    prop_assert!(latest_begin.is_none());
                }
            }
        }
    }

    // Invariant 5: the author of a new record is always the session's user
    #[test]
    fn prop_author_is_session_user(state in arb_pending_state(), user in "[a-z]{3,10}", text in "[a-z ]{1,20}") {
        let ctx = UserContext::new(user.clone());
        let result = transition(&state, &ctx, Event::TextReceived { text }).unwrap();
        for effect in result.effects {
            match effect {
                Effect::Persist(Submission::NewQuestion { author, .. } | Submission::NewAnswer { author, .. }) => {
                    prop_assert_eq!(&author, &user);
                }
                _ => {}
            }
        }
    }
}

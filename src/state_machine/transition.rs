//! Pure state transition function

use super::{Effect, Event, PendingConversation, Submission, UserContext};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: PendingConversation,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: PendingConversation) -> Self {
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
    #[error("No conversation is waiting for text")]
    NothingPending,
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs, with no I/O.
pub fn transition(
    state: &PendingConversation,
    context: &UserContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Starting a conversation (replaces whatever was pending)
        // ============================================================
        (current, Event::AskQuestion) => Ok(begin(current, PendingConversation::AwaitingNewQuestion)),

        (current, Event::EditQuestion { question_id }) => Ok(begin(
            current,
            PendingConversation::AwaitingEditedQuestion { question_id },
        )),

        (current, Event::AnswerQuestion { question_id }) => Ok(begin(
            current,
            PendingConversation::AwaitingNewAnswer { question_id },
        )),

        (current, Event::EditAnswer { answer_id }) => Ok(begin(
            current,
            PendingConversation::AwaitingEditedAnswer { answer_id },
        )),

        // ============================================================
        // Completing a conversation (always back to Idle)
        // ============================================================
        (PendingConversation::Idle, Event::TextReceived { .. }) => {
            Err(TransitionError::NothingPending)
        }

        (PendingConversation::AwaitingNewQuestion, Event::TextReceived { text }) => {
            Ok(complete(Submission::NewQuestion {
                author: context.user_id.clone(),
                text,
            }))
        }

        (PendingConversation::AwaitingNewAnswer { question_id }, Event::TextReceived { text }) => {
            Ok(complete(Submission::NewAnswer {
                question_id: *question_id,
                author: context.user_id.clone(),
                text,
            }))
        }

        (
            PendingConversation::AwaitingEditedQuestion { question_id },
            Event::TextReceived { text },
        ) => Ok(complete(Submission::EditedQuestion {
            question_id: *question_id,
            text,
        })),

        (PendingConversation::AwaitingEditedAnswer { answer_id }, Event::TextReceived { text }) => {
            Ok(complete(Submission::EditedAnswer {
                answer_id: *answer_id,
                text,
            }))
        }
    }
}

fn begin(current: &PendingConversation, next: PendingConversation) -> TransitionResult {
    let mut result = TransitionResult::new(next.clone());
    if !current.is_idle() {
        result = result.with_effect(Effect::DiscardPending {
            previous: current.clone(),
        });
    }
    match next.prompt() {
        Some(prompt) => result.with_effect(Effect::send_text(prompt)),
        None => result,
    }
}

fn complete(submission: Submission) -> TransitionResult {
    TransitionResult::new(PendingConversation::Idle).with_effect(Effect::Persist(submission))
}

//! Conversation state types

use crate::db::{AnswerId, QuestionId};
use serde::{Deserialize, Serialize};

/// What free-text input a user owes us next
///
/// At most one per user. It is consumed by the next text message, whatever
/// the outcome of the resulting store operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PendingConversation {
    /// Nothing expected; text goes to the menu dispatcher
    #[default]
    Idle,

    /// Next text becomes a new question
    AwaitingNewQuestion,

    /// Next text becomes an answer to `question_id`
    AwaitingNewAnswer { question_id: QuestionId },

    /// Next text replaces the text of `question_id`
    AwaitingEditedQuestion { question_id: QuestionId },

    /// Next text replaces the text of `answer_id`
    AwaitingEditedAnswer { answer_id: AnswerId },
}

impl PendingConversation {
    pub fn is_idle(&self) -> bool {
        matches!(self, PendingConversation::Idle)
    }

    /// Prompt shown when entering this state
    pub fn prompt(&self) -> Option<&'static str> {
        match self {
            PendingConversation::Idle => None,
            PendingConversation::AwaitingNewQuestion => Some("Enter your question:"),
            PendingConversation::AwaitingNewAnswer { .. } => Some("Enter your answer:"),
            PendingConversation::AwaitingEditedQuestion { .. } => {
                Some("Enter the new text for your question:")
            }
            PendingConversation::AwaitingEditedAnswer { .. } => {
                Some("Enter the new text for your answer:")
            }
        }
    }
}

/// Context for a user session (immutable configuration)
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: String,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

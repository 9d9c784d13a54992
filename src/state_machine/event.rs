//! Events that can occur in a user's conversation

use crate::db::{AnswerId, QuestionId};

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Starting a conversation (menu choice or button press)
    AskQuestion,
    EditQuestion { question_id: QuestionId },
    AnswerQuestion { question_id: QuestionId },
    EditAnswer { answer_id: AnswerId },

    // Completing one
    TextReceived { text: String },
}

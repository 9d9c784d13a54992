//! Effects produced by state transitions

use super::PendingConversation;
use crate::db::{AnswerId, QuestionId};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// An unconsumed pending conversation was replaced
    DiscardPending { previous: PendingConversation },

    /// Send plain text to the user
    SendText { text: String },

    /// Write the user's text to the record store, then confirm or report failure
    Persist(Submission),
}

/// A completed piece of free-text input, ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    NewQuestion {
        author: String,
        text: String,
    },
    NewAnswer {
        question_id: QuestionId,
        author: String,
        text: String,
    },
    EditedQuestion {
        question_id: QuestionId,
        text: String,
    },
    EditedAnswer {
        answer_id: AnswerId,
        text: String,
    },
}

impl Submission {
    /// Reply sent once the store accepted the submission
    pub fn confirmation(&self) -> &'static str {
        match self {
            Submission::NewQuestion { .. } => "Thanks! Your question has been added.",
            Submission::NewAnswer { .. } => "Your answer has been saved.",
            Submission::EditedQuestion { .. } => "Your question has been edited.",
            Submission::EditedAnswer { .. } => "Your answer has been edited.",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Submission::NewQuestion { .. } => "new_question",
            Submission::NewAnswer { .. } => "new_answer",
            Submission::EditedQuestion { .. } => "edited_question",
            Submission::EditedAnswer { .. } => "edited_answer",
        }
    }
}

impl Effect {
    pub fn send_text(text: impl Into<String>) -> Self {
        Effect::SendText { text: text.into() }
    }
}

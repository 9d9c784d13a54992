//! Inbound payload decoding
//!
//! Button presses arrive as string tags (`like_answer_7`, `prev_question_-1`).
//! They are decoded exactly once, here, into [`Action`]; everything past the
//! boundary works with the typed value. The tag grammar is a wire contract:
//! [`Action::tag`] and [`Action::from_str`] must stay inverse to each other.

use crate::db::{AnswerId, QuestionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What a user sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// Free text, including labels of keyboard menu choices
    Text(String),
    /// Raw tag of an inline button
    Action(String),
}

/// A decoded button press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    EditQuestion(QuestionId),
    EditAnswer(AnswerId),
    LikeQuestion(QuestionId),
    LikeAnswer(AnswerId),
    AnswerQuestion(QuestionId),
    NextQuestion(i64),
    PrevQuestion(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// No known verb matches; the press is ignored
    #[error("Unknown action tag: {0}")]
    Unknown(String),
    /// Known verb, unusable argument; logged and dropped
    #[error("Malformed argument in action tag {tag:?}")]
    Malformed { tag: String },
}

// `answer_` is the shortest verb and stays last.
const PREFIXES: &[(&str, fn(i64) -> Action)] = &[
    ("edit_question_", Action::EditQuestion),
    ("edit_answer_", Action::EditAnswer),
    ("like_question_", Action::LikeQuestion),
    ("like_answer_", Action::LikeAnswer),
    ("next_question_", Action::NextQuestion),
    ("prev_question_", Action::PrevQuestion),
    ("answer_", Action::AnswerQuestion),
];

impl Action {
    /// Encode as a wire tag
    pub fn tag(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::EditQuestion(id) => write!(f, "edit_question_{id}"),
            Action::EditAnswer(id) => write!(f, "edit_answer_{id}"),
            Action::LikeQuestion(id) => write!(f, "like_question_{id}"),
            Action::LikeAnswer(id) => write!(f, "like_answer_{id}"),
            Action::AnswerQuestion(id) => write!(f, "answer_{id}"),
            Action::NextQuestion(index) => write!(f, "next_question_{index}"),
            Action::PrevQuestion(index) => write!(f, "prev_question_{index}"),
        }
    }
}

impl FromStr for Action {
    type Err = ActionError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let (argument, build) = PREFIXES
            .iter()
            .find_map(|(prefix, build)| tag.strip_prefix(prefix).map(|rest| (rest, build)))
            .ok_or_else(|| ActionError::Unknown(tag.to_string()))?;

        // i64::from_str accepts a leading '+', which no encoder produces
        if argument.starts_with('+') {
            return Err(ActionError::Malformed {
                tag: tag.to_string(),
            });
        }

        argument
            .parse::<i64>()
            .map(build)
            .map_err(|_| ActionError::Malformed {
                tag: tag.to_string(),
            })
    }
}

/// Main menu commands, matched against free text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    AskQuestion,
    MyQuestions,
    BrowseQuestions,
    MyAnswers,
}

impl Command {
    /// Keyboard choices of the main menu, in display order
    pub const MAIN_MENU: [Command; 4] = [
        Command::AskQuestion,
        Command::MyQuestions,
        Command::BrowseQuestions,
        Command::MyAnswers,
    ];

    /// Match text against the menu labels and slash commands
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "/start" | "/menu" => Some(Command::Start),
            "Ask a question" | "/ask" => Some(Command::AskQuestion),
            "My questions" | "/questions" => Some(Command::MyQuestions),
            "Browse questions" | "/browse" => Some(Command::BrowseQuestions),
            "My answers" | "/answers" => Some(Command::MyAnswers),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Command::Start => "/start",
            Command::AskQuestion => "Ask a question",
            Command::MyQuestions => "My questions",
            Command::BrowseQuestions => "Browse questions",
            Command::MyAnswers => "My answers",
        }
    }
}

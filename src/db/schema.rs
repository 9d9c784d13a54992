//! Database schema and record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
///
/// `AUTOINCREMENT` keeps rowids strictly increasing and never reused, which
/// question paging relies on (page index `i` addresses question id `i + 1`).
pub const SCHEMA: &str = r"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS questions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    question TEXT NOT NULL,
    likes INTEGER NOT NULL DEFAULT 0 CHECK (likes >= 0),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_questions_username ON questions(username);

CREATE TABLE IF NOT EXISTS answers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    question_id INTEGER NOT NULL,
    username TEXT NOT NULL,
    answer TEXT NOT NULL,
    likes INTEGER NOT NULL DEFAULT 0 CHECK (likes >= 0),
    created_at TEXT NOT NULL,

    FOREIGN KEY (question_id) REFERENCES questions(id)
);

CREATE INDEX IF NOT EXISTS idx_answers_question ON answers(question_id, id);
CREATE INDEX IF NOT EXISTS idx_answers_username ON answers(username);
";

pub type QuestionId = i64;
pub type AnswerId = i64;

/// A submitted question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub author: String,
    pub text: String,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
}

/// A response to exactly one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub question_id: QuestionId,
    pub author: String,
    pub text: String,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
}

/// Row of the "my questions" listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSummary {
    pub id: QuestionId,
    pub text: String,
}

/// Row of the "my answers" listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoredAnswer {
    pub question_id: QuestionId,
    pub question_text: String,
    pub answer_id: AnswerId,
    pub answer_text: String,
}

/// A question together with all of its answers, in creation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionThread {
    pub question: Question,
    pub answers: Vec<Answer>,
}

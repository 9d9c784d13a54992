//! Database module for the question exchange
//!
//! Provides persistence for questions, answers and their like counters.

mod schema;

pub use schema::*;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Question not found: {0}")]
    QuestionNotFound(QuestionId),
    #[error("Answer not found: {0}")]
    AnswerNotFound(AnswerId),
    #[error("Database connection lock poisoned")]
    Poisoned,
    #[error("Database busy: lock not acquired before the deadline")]
    Busy,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    /// Give up instead of waiting for the connection past this instant
    lock_deadline: Option<Instant>,
}

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(2);

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            lock_deadline: None,
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            lock_deadline: None,
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// A handle on the same connection whose operations fail with `Busy`
    /// rather than wait for the lock past `deadline`
    pub fn with_lock_deadline(&self, deadline: Instant) -> Self {
        Self {
            conn: self.conn.clone(),
            lock_deadline: Some(deadline),
        }
    }

    pub(crate) fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        let Some(deadline) = self.lock_deadline else {
            return self.conn.lock().map_err(|_| DbError::Poisoned);
        };
        loop {
            match self.conn.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(_)) => return Err(DbError::Poisoned),
                Err(TryLockError::WouldBlock) if Instant::now() >= deadline => {
                    return Err(DbError::Busy)
                }
                Err(TryLockError::WouldBlock) => std::thread::sleep(LOCK_POLL_INTERVAL),
            }
        }
    }

    // ==================== Question Operations ====================

    /// Create a new question
    pub fn create_question(&self, author: &str, text: &str) -> DbResult<Question> {
        let conn = self.lock()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO questions (username, question, likes, created_at) VALUES (?1, ?2, 0, ?3)",
            params![author, text, now.to_rfc3339()],
        )?;

        Ok(Question {
            id: conn.last_insert_rowid(),
            author: author.to_string(),
            text: text.to_string(),
            likes: 0,
            created_at: now,
        })
    }

    /// Get question by ID
    pub fn get_question(&self, id: QuestionId) -> DbResult<Question> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, username, question, likes, created_at FROM questions WHERE id = ?1",
            params![id],
            parse_question_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::QuestionNotFound(id),
            other => DbError::Sqlite(other),
        })
    }

    /// Replace the text of a question
    pub fn edit_question(&self, id: QuestionId, text: &str) -> DbResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE questions SET question = ?1 WHERE id = ?2",
            params![text, id],
        )?;

        if updated == 0 {
            return Err(DbError::QuestionNotFound(id));
        }
        Ok(())
    }

    /// Increment the like counter of a question, returning the new count
    pub fn like_question(&self, id: QuestionId) -> DbResult<i64> {
        let conn = self.lock()?;
        conn.query_row(
            "UPDATE questions SET likes = likes + 1 WHERE id = ?1 RETURNING likes",
            params![id],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::QuestionNotFound(id),
            other => DbError::Sqlite(other),
        })
    }

    /// List questions written by `author`, oldest first
    pub fn list_questions_by_author(&self, author: &str) -> DbResult<Vec<QuestionSummary>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, question FROM questions WHERE username = ?1 ORDER BY id ASC")?;

        let rows = stmt.query_map(params![author], |row| {
            Ok(QuestionSummary {
                id: row.get(0)?,
                text: row.get(1)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    // ==================== Answer Operations ====================

    /// Create an answer on an existing question
    pub fn create_answer(
        &self,
        question_id: QuestionId,
        author: &str,
        text: &str,
    ) -> DbResult<Answer> {
        let conn = self.lock()?;
        let now = Utc::now();

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM questions WHERE id = ?1)",
            params![question_id],
            |row| row.get(0),
        )?;

        if !exists {
            return Err(DbError::QuestionNotFound(question_id));
        }

        conn.execute(
            "INSERT INTO answers (question_id, username, answer, likes, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![question_id, author, text, now.to_rfc3339()],
        )?;

        Ok(Answer {
            id: conn.last_insert_rowid(),
            question_id,
            author: author.to_string(),
            text: text.to_string(),
            likes: 0,
            created_at: now,
        })
    }

    /// Replace the text of an answer
    pub fn edit_answer(&self, id: AnswerId, text: &str) -> DbResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE answers SET answer = ?1 WHERE id = ?2",
            params![text, id],
        )?;

        if updated == 0 {
            return Err(DbError::AnswerNotFound(id));
        }
        Ok(())
    }

    /// Increment the like counter of an answer, returning the new count
    pub fn like_answer(&self, id: AnswerId) -> DbResult<i64> {
        let conn = self.lock()?;
        conn.query_row(
            "UPDATE answers SET likes = likes + 1 WHERE id = ?1 RETURNING likes",
            params![id],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::AnswerNotFound(id),
            other => DbError::Sqlite(other),
        })
    }

    /// List answers written by `author`, whoever owns the question
    pub fn list_answers_by_author(&self, author: &str) -> DbResult<Vec<AuthoredAnswer>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT q.id, q.question, a.id, a.answer
             FROM answers a JOIN questions q ON q.id = a.question_id
             WHERE a.username = ?1
             ORDER BY a.id ASC",
        )?;

        let rows = stmt.query_map(params![author], |row| {
            Ok(AuthoredAnswer {
                question_id: row.get(0)?,
                question_text: row.get(1)?,
                answer_id: row.get(2)?,
                answer_text: row.get(3)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Get a question and all of its answers in creation order
    pub fn get_question_with_answers(&self, question_id: QuestionId) -> DbResult<QuestionThread> {
        let question = self.get_question(question_id)?;

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, question_id, username, answer, likes, created_at
             FROM answers WHERE question_id = ?1 ORDER BY id ASC",
        )?;

        let answers = stmt
            .query_map(params![question_id], parse_answer_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QuestionThread { question, answers })
    }
}

fn parse_question_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Question> {
    Ok(Question {
        id: row.get(0)?,
        author: row.get(1)?,
        text: row.get(2)?,
        likes: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn parse_answer_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Answer> {
    Ok(Answer {
        id: row.get(0)?,
        question_id: row.get(1)?,
        author: row.get(2)?,
        text: row.get(3)?,
        likes: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

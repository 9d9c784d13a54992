//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the sessions with mock implementations.

use crate::db::{
    AnswerId, AuthoredAnswer, Database, DbError, DbResult, QuestionId, QuestionSummary,
    QuestionThread,
};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::broadcast;

// ============================================================================
// Record Store
// ============================================================================

/// Which kind of record an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Question,
    Answer,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Question => write!(f, "question"),
            RecordKind::Answer => write!(f, "answer"),
        }
    }
}

/// Record store failure; `NotFound` is distinguishable from everything else
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: i64 },
    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn question_not_found(id: QuestionId) -> Self {
        StoreError::NotFound {
            kind: RecordKind::Question,
            id,
        }
    }

    pub fn answer_not_found(id: AnswerId) -> Self {
        StoreError::NotFound {
            kind: RecordKind::Answer,
            id,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::QuestionNotFound(id) => StoreError::question_not_found(id),
            DbError::AnswerNotFound(id) => StoreError::answer_not_found(id),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Storage for questions and answers
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_question(&self, author: &str, text: &str) -> Result<QuestionId, StoreError>;

    /// Fails with `NotFound` if the question does not exist
    async fn create_answer(
        &self,
        question_id: QuestionId,
        author: &str,
        text: &str,
    ) -> Result<AnswerId, StoreError>;

    async fn edit_question(&self, id: QuestionId, text: &str) -> Result<(), StoreError>;

    async fn edit_answer(&self, id: AnswerId, text: &str) -> Result<(), StoreError>;

    /// Atomically add one like, returning the new count
    async fn like_question(&self, id: QuestionId) -> Result<i64, StoreError>;

    /// Atomically add one like, returning the new count
    async fn like_answer(&self, id: AnswerId) -> Result<i64, StoreError>;

    async fn list_questions_by_author(
        &self,
        author: &str,
    ) -> Result<Vec<QuestionSummary>, StoreError>;

    /// Answers written by `author`, on anyone's question
    async fn list_answers_by_author(&self, author: &str)
        -> Result<Vec<AuthoredAnswer>, StoreError>;

    /// The question plus its answers in creation order
    async fn get_question_with_answers(
        &self,
        question_id: QuestionId,
    ) -> Result<QuestionThread, StoreError>;
}

// ============================================================================
// Messaging Channel
// ============================================================================

/// How the transport presents a menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuKind {
    /// Persistent keyboard; a press comes back as the label text
    Keyboard,
    /// Buttons attached to the message; a press comes back as the tag
    Inline,
}

/// One selectable choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub label: String,
    pub tag: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tag: tag.into(),
        }
    }
}

/// Text with an ordered set of choices
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Menu {
    pub text: String,
    pub kind: MenuKind,
    pub choices: Vec<Choice>,
}

/// Anything the core sends to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Text { text: String },
    Menu(Menu),
}

impl Outbound {
    pub fn text(text: impl Into<String>) -> Self {
        Outbound::Text { text: text.into() }
    }
}

/// Delivery of replies to users
#[async_trait]
pub trait MessagingChannel: Send + Sync {
    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), String>;

    async fn send_menu(&self, user_id: &str, menu: &Menu) -> Result<(), String>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn create_question(&self, author: &str, text: &str) -> Result<QuestionId, StoreError> {
        (**self).create_question(author, text).await
    }

    async fn create_answer(
        &self,
        question_id: QuestionId,
        author: &str,
        text: &str,
    ) -> Result<AnswerId, StoreError> {
        (**self).create_answer(question_id, author, text).await
    }

    async fn edit_question(&self, id: QuestionId, text: &str) -> Result<(), StoreError> {
        (**self).edit_question(id, text).await
    }

    async fn edit_answer(&self, id: AnswerId, text: &str) -> Result<(), StoreError> {
        (**self).edit_answer(id, text).await
    }

    async fn like_question(&self, id: QuestionId) -> Result<i64, StoreError> {
        (**self).like_question(id).await
    }

    async fn like_answer(&self, id: AnswerId) -> Result<i64, StoreError> {
        (**self).like_answer(id).await
    }

    async fn list_questions_by_author(
        &self,
        author: &str,
    ) -> Result<Vec<QuestionSummary>, StoreError> {
        (**self).list_questions_by_author(author).await
    }

    async fn list_answers_by_author(
        &self,
        author: &str,
    ) -> Result<Vec<AuthoredAnswer>, StoreError> {
        (**self).list_answers_by_author(author).await
    }

    async fn get_question_with_answers(
        &self,
        question_id: QuestionId,
    ) -> Result<QuestionThread, StoreError> {
        (**self).get_question_with_answers(question_id).await
    }
}

#[async_trait]
impl<T: MessagingChannel + ?Sized> MessagingChannel for Arc<T> {
    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), String> {
        (**self).send_text(user_id, text).await
    }

    async fn send_menu(&self, user_id: &str, menu: &Menu) -> Result<(), String> {
        (**self).send_menu(user_id, menu).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as a `RecordStore`
///
/// SQLite calls block, so each one runs on the blocking pool. With a lock
/// timeout, a call that cannot get the connection in time fails with
/// `Unavailable` and writes nothing, so a caller that has stopped waiting
/// does not get a late commit behind its back.
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
    lock_timeout: Option<Duration>,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            lock_timeout: None,
        }
    }

    /// Bound how long each call may wait for the connection
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> DbResult<T> + Send + 'static,
    {
        let db = match self.lock_timeout {
            Some(timeout) => self.db.with_lock_deadline(Instant::now() + timeout),
            None => self.db.clone(),
        };
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| StoreError::Unavailable(format!("Database task failed: {e}")))?
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl RecordStore for DatabaseStore {
    async fn create_question(&self, author: &str, text: &str) -> Result<QuestionId, StoreError> {
        let (author, text) = (author.to_string(), text.to_string());
        self.blocking(move |db| db.create_question(&author, &text).map(|q| q.id))
            .await
    }

    async fn create_answer(
        &self,
        question_id: QuestionId,
        author: &str,
        text: &str,
    ) -> Result<AnswerId, StoreError> {
        let (author, text) = (author.to_string(), text.to_string());
        self.blocking(move |db| db.create_answer(question_id, &author, &text).map(|a| a.id))
            .await
    }

    async fn edit_question(&self, id: QuestionId, text: &str) -> Result<(), StoreError> {
        let text = text.to_string();
        self.blocking(move |db| db.edit_question(id, &text)).await
    }

    async fn edit_answer(&self, id: AnswerId, text: &str) -> Result<(), StoreError> {
        let text = text.to_string();
        self.blocking(move |db| db.edit_answer(id, &text)).await
    }

    async fn like_question(&self, id: QuestionId) -> Result<i64, StoreError> {
        self.blocking(move |db| db.like_question(id)).await
    }

    async fn like_answer(&self, id: AnswerId) -> Result<i64, StoreError> {
        self.blocking(move |db| db.like_answer(id)).await
    }

    async fn list_questions_by_author(
        &self,
        author: &str,
    ) -> Result<Vec<QuestionSummary>, StoreError> {
        let author = author.to_string();
        self.blocking(move |db| db.list_questions_by_author(&author))
            .await
    }

    async fn list_answers_by_author(
        &self,
        author: &str,
    ) -> Result<Vec<AuthoredAnswer>, StoreError> {
        let author = author.to_string();
        self.blocking(move |db| db.list_answers_by_author(&author))
            .await
    }

    async fn get_question_with_answers(
        &self,
        question_id: QuestionId,
    ) -> Result<QuestionThread, StoreError> {
        self.blocking(move |db| db.get_question_with_answers(question_id))
            .await
    }
}

/// Logging wrapper for record stores
pub struct LoggingStore<S> {
    inner: S,
}

impl<S: RecordStore> LoggingStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

fn log_outcome<T>(operation: &'static str, start: Instant, result: &Result<T, StoreError>) {
    let duration_ms = start.elapsed().as_millis();
    match result {
        Ok(_) => tracing::debug!(operation, duration_ms, "Store operation completed"),
        Err(e) if e.is_not_found() => {
            tracing::info!(operation, duration_ms, error = %e, "Store record not found");
        }
        Err(e) => tracing::error!(operation, duration_ms, error = %e, "Store operation failed"),
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for LoggingStore<S> {
    async fn create_question(&self, author: &str, text: &str) -> Result<QuestionId, StoreError> {
        let start = Instant::now();
        let result = self.inner.create_question(author, text).await;
        log_outcome("create_question", start, &result);
        result
    }

    async fn create_answer(
        &self,
        question_id: QuestionId,
        author: &str,
        text: &str,
    ) -> Result<AnswerId, StoreError> {
        let start = Instant::now();
        let result = self.inner.create_answer(question_id, author, text).await;
        log_outcome("create_answer", start, &result);
        result
    }

    async fn edit_question(&self, id: QuestionId, text: &str) -> Result<(), StoreError> {
        let start = Instant::now();
        let result = self.inner.edit_question(id, text).await;
        log_outcome("edit_question", start, &result);
        result
    }

    async fn edit_answer(&self, id: AnswerId, text: &str) -> Result<(), StoreError> {
        let start = Instant::now();
        let result = self.inner.edit_answer(id, text).await;
        log_outcome("edit_answer", start, &result);
        result
    }

    async fn like_question(&self, id: QuestionId) -> Result<i64, StoreError> {
        let start = Instant::now();
        let result = self.inner.like_question(id).await;
        log_outcome("like_question", start, &result);
        result
    }

    async fn like_answer(&self, id: AnswerId) -> Result<i64, StoreError> {
        let start = Instant::now();
        let result = self.inner.like_answer(id).await;
        log_outcome("like_answer", start, &result);
        result
    }

    async fn list_questions_by_author(
        &self,
        author: &str,
    ) -> Result<Vec<QuestionSummary>, StoreError> {
        let start = Instant::now();
        let result = self.inner.list_questions_by_author(author).await;
        log_outcome("list_questions_by_author", start, &result);
        result
    }

    async fn list_answers_by_author(
        &self,
        author: &str,
    ) -> Result<Vec<AuthoredAnswer>, StoreError> {
        let start = Instant::now();
        let result = self.inner.list_answers_by_author(author).await;
        log_outcome("list_answers_by_author", start, &result);
        result
    }

    async fn get_question_with_answers(
        &self,
        question_id: QuestionId,
    ) -> Result<QuestionThread, StoreError> {
        let start = Instant::now();
        let result = self.inner.get_question_with_answers(question_id).await;
        log_outcome("get_question_with_answers", start, &result);
        result
    }
}

/// Channel that fans replies out to per-user broadcast streams (SSE clients)
///
/// Replies to a user with no connected client are dropped.
#[derive(Default)]
pub struct BroadcastOutbox {
    streams: RwLock<HashMap<String, broadcast::Sender<Outbound>>>,
}

const OUTBOX_CAPACITY: usize = 128;

impl BroadcastOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to everything sent to `user_id` from now on
    pub fn subscribe(&self, user_id: &str) -> Result<broadcast::Receiver<Outbound>, String> {
        let mut streams = self
            .streams
            .write()
            .map_err(|_| "Outbox lock poisoned".to_string())?;
        // Streams whose clients all disconnected
        streams.retain(|_, tx| tx.receiver_count() > 0);
        let tx = streams
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(OUTBOX_CAPACITY).0);
        Ok(tx.subscribe())
    }

    fn publish(&self, user_id: &str, message: Outbound) -> Result<(), String> {
        let delivered = {
            let streams = self
                .streams
                .read()
                .map_err(|_| "Outbox lock poisoned".to_string())?;
            streams.get(user_id).is_some_and(|tx| tx.send(message).is_ok())
        };
        if delivered {
            return Ok(());
        }

        tracing::debug!(user = %user_id, "No listener for outbound message, dropping");
        let mut streams = self
            .streams
            .write()
            .map_err(|_| "Outbox lock poisoned".to_string())?;
        if streams.get(user_id).is_some_and(|tx| tx.receiver_count() == 0) {
            streams.remove(user_id);
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingChannel for BroadcastOutbox {
    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), String> {
        self.publish(user_id, Outbound::text(text))
    }

    async fn send_menu(&self, user_id: &str, menu: &Menu) -> Result<(), String> {
        self.publish(user_id, Outbound::Menu(menu.clone()))
    }
}

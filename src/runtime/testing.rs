//! Mock implementations for testing
//!
//! These mocks enable session testing without real I/O.

use super::traits::*;
use crate::db::{
    Answer, AnswerId, AuthoredAnswer, Question, QuestionId, QuestionSummary, QuestionThread,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// In-Memory Record Store
// ============================================================================

#[derive(Default)]
struct Records {
    questions: BTreeMap<QuestionId, Question>,
    answers: BTreeMap<AnswerId, Answer>,
}

/// Record store held in memory, with injectable failures and latency
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<Records>,
    failure: Mutex<Option<StoreError>>,
    delay: Option<Duration>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call, to exercise timeouts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call from now on
    pub fn fail_with(&self, error: StoreError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn question_count(&self) -> usize {
        self.records.lock().unwrap().questions.len()
    }

    async fn check(&self) -> Result<(), StoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn next_id<T>(map: &BTreeMap<i64, T>) -> i64 {
    map.keys().next_back().map_or(1, |id| id + 1)
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn create_question(&self, author: &str, text: &str) -> Result<QuestionId, StoreError> {
        self.check().await?;
        let mut records = self.records.lock().unwrap();
        let id = next_id(&records.questions);
        records.questions.insert(
            id,
            Question {
                id,
                author: author.to_string(),
                text: text.to_string(),
                likes: 0,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn create_answer(
        &self,
        question_id: QuestionId,
        author: &str,
        text: &str,
    ) -> Result<AnswerId, StoreError> {
        self.check().await?;
        let mut records = self.records.lock().unwrap();
        if !records.questions.contains_key(&question_id) {
            return Err(StoreError::question_not_found(question_id));
        }
        let id = next_id(&records.answers);
        records.answers.insert(
            id,
            Answer {
                id,
                question_id,
                author: author.to_string(),
                text: text.to_string(),
                likes: 0,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn edit_question(&self, id: QuestionId, text: &str) -> Result<(), StoreError> {
        self.check().await?;
        let mut records = self.records.lock().unwrap();
        let question = records
            .questions
            .get_mut(&id)
            .ok_or_else(|| StoreError::question_not_found(id))?;
        question.text = text.to_string();
        Ok(())
    }

    async fn edit_answer(&self, id: AnswerId, text: &str) -> Result<(), StoreError> {
        self.check().await?;
        let mut records = self.records.lock().unwrap();
        let answer = records
            .answers
            .get_mut(&id)
            .ok_or_else(|| StoreError::answer_not_found(id))?;
        answer.text = text.to_string();
        Ok(())
    }

    async fn like_question(&self, id: QuestionId) -> Result<i64, StoreError> {
        self.check().await?;
        let mut records = self.records.lock().unwrap();
        let question = records
            .questions
            .get_mut(&id)
            .ok_or_else(|| StoreError::question_not_found(id))?;
        question.likes += 1;
        Ok(question.likes)
    }

    async fn like_answer(&self, id: AnswerId) -> Result<i64, StoreError> {
        self.check().await?;
        let mut records = self.records.lock().unwrap();
        let answer = records
            .answers
            .get_mut(&id)
            .ok_or_else(|| StoreError::answer_not_found(id))?;
        answer.likes += 1;
        Ok(answer.likes)
    }

    async fn list_questions_by_author(
        &self,
        author: &str,
    ) -> Result<Vec<QuestionSummary>, StoreError> {
        self.check().await?;
        let records = self.records.lock().unwrap();
        Ok(records
            .questions
            .values()
            .filter(|q| q.author == author)
            .map(|q| QuestionSummary {
                id: q.id,
                text: q.text.clone(),
            })
            .collect())
    }

    async fn list_answers_by_author(
        &self,
        author: &str,
    ) -> Result<Vec<AuthoredAnswer>, StoreError> {
        self.check().await?;
        let records = self.records.lock().unwrap();
        Ok(records
            .answers
            .values()
            .filter(|a| a.author == author)
            .filter_map(|a| {
                records.questions.get(&a.question_id).map(|q| AuthoredAnswer {
                    question_id: q.id,
                    question_text: q.text.clone(),
                    answer_id: a.id,
                    answer_text: a.text.clone(),
                })
            })
            .collect())
    }

    async fn get_question_with_answers(
        &self,
        question_id: QuestionId,
    ) -> Result<QuestionThread, StoreError> {
        self.check().await?;
        let records = self.records.lock().unwrap();
        let question = records
            .questions
            .get(&question_id)
            .cloned()
            .ok_or_else(|| StoreError::question_not_found(question_id))?;
        let answers = records
            .answers
            .values()
            .filter(|a| a.question_id == question_id)
            .cloned()
            .collect();
        Ok(QuestionThread { question, answers })
    }
}

// ============================================================================
// Recording Channel
// ============================================================================

/// Messaging channel that records everything sent
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<(String, Outbound)>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages_for(&self, user_id: &str) -> Vec<Outbound> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(user, _)| user == user_id)
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Plain texts sent to a user, skipping menus
    pub fn texts_for(&self, user_id: &str) -> Vec<String> {
        self.messages_for(user_id)
            .into_iter()
            .filter_map(|message| match message {
                Outbound::Text { text } => Some(text),
                Outbound::Menu(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// Wait until a user has received at least `count` messages
    pub async fn wait_for_messages(&self, user_id: &str, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.messages_for(user_id).len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.messages_for(user_id).len() >= count
    }
}

#[async_trait]
impl MessagingChannel for RecordingChannel {
    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), String> {
        self.sent
            .lock()
            .unwrap()
            .push((user_id.to_string(), Outbound::text(text)));
        Ok(())
    }

    async fn send_menu(&self, user_id: &str, menu: &Menu) -> Result<(), String> {
        self.sent
            .lock()
            .unwrap()
            .push((user_id.to_string(), Outbound::Menu(menu.clone())));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_concurrent_likes_are_atomic() {
        let store = Arc::new(InMemoryStore::new());
        let q = store.create_question("alice", "Q").await.unwrap();
        let a = store.create_answer(q, "bob", "A").await.unwrap();

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.like_answer(a).await.unwrap() })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.like_answer(a).await.unwrap(), 51);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = InMemoryStore::new();
        store.fail_with(StoreError::Unavailable("offline".to_string()));
        assert!(matches!(
            store.create_question("alice", "Q").await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.question_count(), 0);
    }
}

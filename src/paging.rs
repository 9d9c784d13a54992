//! Ranked pagination over questions and their answers
//!
//! One question is shown at a time, addressed by a zero-based index: index
//! `i` is question id `i + 1`. Questions stay in id order; only the answers
//! on a page are ranked, by descending likes with ties in creation order.

use crate::action::Action;
use crate::db::{Answer, Question, QuestionId};
use crate::runtime::{RecordStore, StoreError};
use std::cmp::Reverse;

/// A rendered question with its ranked answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionPage {
    pub index: i64,
    pub question: Question,
    pub answers: Vec<Answer>,
}

impl QuestionPage {
    pub fn answer_action(&self) -> Action {
        Action::AnswerQuestion(self.question.id)
    }

    pub fn like_action(&self) -> Action {
        Action::LikeQuestion(self.question.id)
    }

    /// Not validated; an out-of-range target renders as empty
    pub fn previous(&self) -> Action {
        Action::PrevQuestion(self.index.saturating_sub(1))
    }

    pub fn next(&self) -> Action {
        Action::NextQuestion(self.index.saturating_add(1))
    }

    /// Like actions for each answer, in page order
    pub fn answer_like_actions(&self) -> impl Iterator<Item = (&Answer, Action)> {
        self.answers.iter().map(|a| (a, Action::LikeAnswer(a.id)))
    }
}

/// Question id addressed by a page index
pub fn question_id_for_index(index: i64) -> Option<QuestionId> {
    if index < 0 {
        return None;
    }
    index.checked_add(1)
}

/// Sort by descending likes, ties by ascending id
pub fn rank_answers(answers: &mut [Answer]) {
    answers.sort_by_key(|a| (Reverse(a.likes), a.id));
}

/// Build the page at `index`
///
/// `None` when the index addresses no question or a question without
/// answers. Only `Unavailable` is returned as an error.
pub async fn render_question_page<S: RecordStore + ?Sized>(
    store: &S,
    index: i64,
) -> Result<Option<QuestionPage>, StoreError> {
    let Some(question_id) = question_id_for_index(index) else {
        return Ok(None);
    };

    let thread = match store.get_question_with_answers(question_id).await {
        Ok(thread) => thread,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e),
    };

    if thread.answers.is_empty() {
        return Ok(None);
    }

    let mut answers = thread.answers;
    rank_answers(&mut answers);

    Ok(Some(QuestionPage {
        index,
        question: thread.question,
        answers,
    }))
}

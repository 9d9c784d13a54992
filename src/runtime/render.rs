//! User-facing texts and menus

use super::traits::{Choice, Menu, MenuKind, Outbound};
use crate::action::{Action, Command};
use crate::db::{AuthoredAnswer, QuestionSummary};
use crate::paging::QuestionPage;

pub const WELCOME: &str = "Hi! Choose an action:";
pub const LIKE_COUNTED: &str = "Your like has been counted.";
pub const NO_QUESTIONS: &str = "You have no questions yet.";
pub const NO_ANSWERS: &str = "You have no answers yet.";
pub const NOTHING_TO_SHOW: &str = "There are no answered questions here yet.";
pub const FAILURE: &str = "Could not complete that request. Please try again later.";
/// The store did not answer in time; the write may still land
pub const OUTCOME_UNKNOWN: &str =
    "That is taking longer than expected and may still go through. Check before trying again.";

pub fn main_menu() -> Menu {
    Menu {
        text: WELCOME.to_string(),
        kind: MenuKind::Keyboard,
        choices: Command::MAIN_MENU
            .iter()
            .map(|c| Choice::new(c.label(), c.label()))
            .collect(),
    }
}

fn inline(text: impl Into<String>, choices: Vec<Choice>) -> Outbound {
    Outbound::Menu(Menu {
        text: text.into(),
        kind: MenuKind::Inline,
        choices,
    })
}

fn action_choice(label: &str, action: Action) -> Choice {
    Choice::new(label, action.tag())
}

/// One message per question, each with an edit button
pub fn my_questions(questions: &[QuestionSummary]) -> Vec<Outbound> {
    if questions.is_empty() {
        return vec![Outbound::text(NO_QUESTIONS)];
    }
    questions
        .iter()
        .map(|q| {
            inline(
                q.text.clone(),
                vec![action_choice("Edit", Action::EditQuestion(q.id))],
            )
        })
        .collect()
}

/// One message per answer with its question, each with an edit button
pub fn my_answers(answers: &[AuthoredAnswer]) -> Vec<Outbound> {
    if answers.is_empty() {
        return vec![Outbound::text(NO_ANSWERS)];
    }
    answers
        .iter()
        .map(|a| {
            inline(
                format!("Question: {}\nYour answer: {}", a.question_text, a.answer_text),
                vec![action_choice("Edit", Action::EditAnswer(a.answer_id))],
            )
        })
        .collect()
}

/// Header, ranked answers with like buttons, then the navigation menu
pub fn question_page(page: &QuestionPage) -> Vec<Outbound> {
    let question = &page.question;
    let mut messages = vec![Outbound::text(format!(
        "Question from @{}:\n{}\n\nLikes: {}\n\nAnswers:",
        question.author, question.text, question.likes
    ))];

    for (answer, like) in page.answer_like_actions() {
        messages.push(Outbound::text(format!(
            "@{}: {}\nLikes: {}",
            answer.author, answer.text, answer.likes
        )));
        messages.push(inline(
            "Like this answer?",
            vec![action_choice("Like", like)],
        ));
    }

    messages.push(inline(
        "Choose an action:",
        vec![
            action_choice("Answer the question", page.answer_action()),
            action_choice("Like the question", page.like_action()),
            action_choice("Back", page.previous()),
            action_choice("Next", page.next()),
        ],
    ));
    messages
}

//! Per-user session executor

use super::render;
use super::traits::{MessagingChannel, Outbound, RecordStore, StoreError};
use crate::action::{Action, ActionError, Command, Payload};
use crate::paging::render_question_page;
use crate::state_machine::{
    transition, Effect, Event, PendingConversation, Submission, UserContext,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::error::Elapsed;
use tracing::Instrument;
use uuid::Uuid;

/// An inbound event queued for a session
#[derive(Debug)]
pub struct Inbound {
    pub event_id: Uuid,
    pub payload: Payload,
}

impl Inbound {
    pub fn new(payload: Payload) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            payload,
        }
    }
}

/// One user's session: owns the pending conversation and handles that
/// user's events strictly one at a time
pub struct UserSession<S, C>
where
    S: RecordStore + 'static,
    C: MessagingChannel + 'static,
{
    context: UserContext,
    state: PendingConversation,
    store: Arc<S>,
    channel: Arc<C>,
    store_timeout: Duration,
    state_tx: watch::Sender<PendingConversation>,
}

impl<S, C> UserSession<S, C>
where
    S: RecordStore + 'static,
    C: MessagingChannel + 'static,
{
    pub fn new(context: UserContext, store: Arc<S>, channel: Arc<C>, store_timeout: Duration) -> Self {
        let (state_tx, _) = watch::channel(PendingConversation::Idle);
        Self {
            context,
            state: PendingConversation::Idle,
            store,
            channel,
            store_timeout,
            state_tx,
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn state(&self) -> &PendingConversation {
        &self.state
    }

    /// Observe the pending conversation from outside the session task
    pub fn watch_state(&self) -> watch::Receiver<PendingConversation> {
        self.state_tx.subscribe()
    }

    pub async fn run(mut self, mut event_rx: mpsc::Receiver<Inbound>) {
        tracing::info!(user = %self.context.user_id, "Starting user session");

        while let Some(inbound) = event_rx.recv().await {
            let span = tracing::info_span!(
                "inbound",
                user = %self.context.user_id,
                event_id = %inbound.event_id
            );
            if let Err(e) = self.handle(inbound.payload).instrument(span).await {
                tracing::error!(user = %self.context.user_id, error = %e, "Error handling event");
            }
        }

        tracing::info!(user = %self.context.user_id, "User session stopped");
    }

    /// Dispatch one inbound payload
    ///
    /// Errors are delivery failures on the messaging channel; store
    /// failures are reported to the user instead.
    pub async fn handle(&mut self, payload: Payload) -> Result<(), String> {
        match payload {
            Payload::Text(text) if !self.state.is_idle() => {
                self.process_event(Event::TextReceived { text }).await
            }
            Payload::Text(text) => match Command::parse(&text) {
                Some(command) => self.run_command(command).await,
                None => {
                    tracing::debug!("Ignoring unmatched text");
                    Ok(())
                }
            },
            Payload::Action(tag) => match tag.parse::<Action>() {
                Ok(action) => self.run_action(action).await,
                Err(ActionError::Unknown(tag)) => {
                    tracing::debug!(tag = %tag, "Ignoring unknown action");
                    Ok(())
                }
                Err(e @ ActionError::Malformed { .. }) => {
                    tracing::warn!(error = %e, "Dropping malformed action");
                    Ok(())
                }
            },
        }
    }

    async fn process_event(&mut self, event: Event) -> Result<(), String> {
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = %e, "Transition rejected");
                return Ok(());
            }
        };

        self.state = result.new_state;
        self.state_tx.send_replace(self.state.clone());

        for effect in result.effects {
            self.execute_effect(effect).await?;
        }
        Ok(())
    }

    async fn execute_effect(&self, effect: Effect) -> Result<(), String> {
        match effect {
            Effect::DiscardPending { previous } => {
                tracing::info!(discarded = ?previous, "Replaced unfinished conversation");
                Ok(())
            }
            Effect::SendText { text } => self.send_text(&text).await,
            Effect::Persist(submission) => self.persist(submission).await,
        }
    }

    async fn persist(&self, submission: Submission) -> Result<(), String> {
        let store = &self.store;
        let outcome = match &submission {
            Submission::NewQuestion { author, text } => self
                .timed(store.create_question(author, text))
                .await
                .map(|r| r.map(|question_id| tracing::info!(question_id, "Question created"))),
            Submission::NewAnswer {
                question_id,
                author,
                text,
            } => self
                .timed(store.create_answer(*question_id, author, text))
                .await
                .map(|r| r.map(|answer_id| tracing::info!(question_id, answer_id, "Answer created"))),
            Submission::EditedQuestion { question_id, text } => {
                self.timed(store.edit_question(*question_id, text)).await
            }
            Submission::EditedAnswer { answer_id, text } => {
                self.timed(store.edit_answer(*answer_id, text)).await
            }
        };

        let reply = match outcome {
            Ok(Ok(())) => submission.confirmation(),
            Ok(Err(e)) => {
                tracing::warn!(kind = submission.kind(), error = %e, "Submission failed");
                render::FAILURE
            }
            Err(_) => {
                tracing::warn!(
                    kind = submission.kind(),
                    timeout_ms = self.store_timeout.as_millis(),
                    "Submission timed out, outcome unknown"
                );
                render::OUTCOME_UNKNOWN
            }
        };
        self.send_text(reply).await
    }

    async fn run_command(&mut self, command: Command) -> Result<(), String> {
        tracing::debug!(?command, "Menu command");
        match command {
            Command::Start => self.deliver(vec![Outbound::Menu(render::main_menu())]).await,
            Command::AskQuestion => self.process_event(Event::AskQuestion).await,
            Command::MyQuestions => {
                let listed = self
                    .bounded(self.store.list_questions_by_author(&self.context.user_id))
                    .await;
                match listed {
                    Ok(questions) => self.deliver(render::my_questions(&questions)).await,
                    Err(e) => self.report_failure(&e).await,
                }
            }
            Command::MyAnswers => {
                let listed = self
                    .bounded(self.store.list_answers_by_author(&self.context.user_id))
                    .await;
                match listed {
                    Ok(answers) => self.deliver(render::my_answers(&answers)).await,
                    Err(e) => self.report_failure(&e).await,
                }
            }
            Command::BrowseQuestions => self.show_page(0).await,
        }
    }

    async fn run_action(&mut self, action: Action) -> Result<(), String> {
        tracing::debug!(%action, "Button action");
        match action {
            Action::EditQuestion(question_id) => {
                self.process_event(Event::EditQuestion { question_id }).await
            }
            Action::EditAnswer(answer_id) => self.process_event(Event::EditAnswer { answer_id }).await,
            Action::AnswerQuestion(question_id) => {
                self.process_event(Event::AnswerQuestion { question_id }).await
            }
            Action::LikeQuestion(question_id) => {
                let liked = self.timed(self.store.like_question(question_id)).await;
                self.report_like(liked).await
            }
            Action::LikeAnswer(answer_id) => {
                let liked = self.timed(self.store.like_answer(answer_id)).await;
                self.report_like(liked).await
            }
            Action::NextQuestion(index) | Action::PrevQuestion(index) => self.show_page(index).await,
        }
    }

    async fn show_page(&self, index: i64) -> Result<(), String> {
        match self.bounded(render_question_page(&*self.store, index)).await {
            Ok(Some(page)) => self.deliver(render::question_page(&page)).await,
            Ok(None) => {
                tracing::debug!(index, "No page at index");
                self.send_text(render::NOTHING_TO_SHOW).await
            }
            Err(e) => self.report_failure(&e).await,
        }
    }

    async fn report_like(&self, liked: Result<Result<i64, StoreError>, Elapsed>) -> Result<(), String> {
        match liked {
            Ok(Ok(likes)) => {
                tracing::info!(likes, "Like counted");
                self.send_text(render::LIKE_COUNTED).await
            }
            Ok(Err(e)) => self.report_failure(&e).await,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.store_timeout.as_millis(),
                    "Like timed out, outcome unknown"
                );
                self.send_text(render::OUTCOME_UNKNOWN).await
            }
        }
    }

    async fn report_failure(&self, error: &StoreError) -> Result<(), String> {
        tracing::warn!(error = %error, "Store request failed");
        self.send_text(render::FAILURE).await
    }

    /// Bound a store read by the session's timeout; expiry is `Unavailable`
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        self.timed(call).await.unwrap_or_else(|_| {
            Err(StoreError::Unavailable(format!(
                "timed out after {}ms",
                self.store_timeout.as_millis()
            )))
        })
    }

    /// Bound a store write by the session's timeout, keeping expiry apart
    /// from failure: a write still in flight may yet commit
    async fn timed<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<Result<T, StoreError>, Elapsed> {
        tokio::time::timeout(self.store_timeout, call).await
    }

    async fn send_text(&self, text: &str) -> Result<(), String> {
        self.channel.send_text(&self.context.user_id, text).await
    }

    async fn deliver(&self, messages: Vec<Outbound>) -> Result<(), String> {
        for message in messages {
            match message {
                Outbound::Text { text } => self.send_text(&text).await?,
                Outbound::Menu(menu) => {
                    self.channel
                        .send_menu(&self.context.user_id, &menu)
                        .await?;
                }
            }
        }
        Ok(())
    }
}

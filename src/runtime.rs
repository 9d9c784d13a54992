//! Session runtime
//!
//! Every user gets one session task, created on first contact and fed by a
//! bounded queue, so a user's events are handled in arrival order and never
//! two at once. Different users are handled concurrently.

mod executor;
pub(crate) mod render;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{Inbound, UserSession};
pub use traits::*;

use crate::action::Payload;
use crate::state_machine::{PendingConversation, UserContext};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};

/// Type alias for the production session manager
pub type ProductionSessions = SessionManager<LoggingStore<DatabaseStore>, BroadcastOutbox>;

const SESSION_QUEUE: usize = 32;

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub event_tx: mpsc::Sender<Inbound>,
    pub state_rx: watch::Receiver<PendingConversation>,
}

/// Manager for all user sessions
pub struct SessionManager<S, C>
where
    S: RecordStore + 'static,
    C: MessagingChannel + 'static,
{
    store: Arc<S>,
    channel: Arc<C>,
    store_timeout: Duration,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl<S, C> SessionManager<S, C>
where
    S: RecordStore + 'static,
    C: MessagingChannel + 'static,
{
    pub fn new(store: Arc<S>, channel: Arc<C>, store_timeout: Duration) -> Self {
        Self {
            store,
            channel,
            store_timeout,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn channel(&self) -> &Arc<C> {
        &self.channel
    }

    /// Get or create the session for a user
    pub async fn get_or_create(&self, user_id: &str) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(user_id) {
            return handle.clone();
        }

        // Re-check under the write lock so a user never gets two sessions
        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get(user_id) {
            return handle.clone();
        }

        let (event_tx, event_rx) = mpsc::channel(SESSION_QUEUE);
        let session = UserSession::new(
            UserContext::new(user_id),
            self.store.clone(),
            self.channel.clone(),
            self.store_timeout,
        );
        let handle = SessionHandle {
            event_tx,
            state_rx: session.watch_state(),
        };
        sessions.insert(user_id.to_string(), handle.clone());
        tokio::spawn(session.run(event_rx));

        handle
    }

    /// Queue an inbound payload for a user
    pub async fn dispatch(&self, user_id: &str, payload: Payload) -> Result<(), String> {
        let inbound = Inbound::new(payload);
        tracing::debug!(user = %user_id, event_id = %inbound.event_id, "Queueing inbound event");
        let handle = self.get_or_create(user_id).await;
        handle
            .event_tx
            .send(inbound)
            .await
            .map_err(|_| format!("Session for {user_id} is not running"))
    }

    /// The user's pending conversation, if they have a session
    pub async fn pending(&self, user_id: &str) -> Option<PendingConversation> {
        self.sessions
            .read()
            .await
            .get(user_id)
            .map(|handle| handle.state_rx.borrow().clone())
    }

    #[allow(dead_code)] // Used in tests
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

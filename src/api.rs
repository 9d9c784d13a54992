//! HTTP messaging channel
//!
//! Inbound text and button presses are queued per user; replies stream
//! back to that user over Server-Sent Events.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::db::Database;
use crate::runtime::{BroadcastOutbox, DatabaseStore, LoggingStore, ProductionSessions};
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<ProductionSessions>,
}

impl AppState {
    pub fn new(db: Database, store_timeout: Duration) -> Self {
        let store = LoggingStore::new(DatabaseStore::new(db).with_lock_timeout(store_timeout));
        Self {
            sessions: Arc::new(ProductionSessions::new(
                Arc::new(store),
                Arc::new(BroadcastOutbox::new()),
                store_timeout,
            )),
        }
    }
}

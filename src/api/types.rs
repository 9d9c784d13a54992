//! API request and response types

use crate::state_machine::PendingConversation;
use serde::{Deserialize, Serialize};

/// Free text from a user
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// Inline button press from a user
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub tag: String,
}

/// Response for inbound events
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

/// What a user's session is waiting for
#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub user: String,
    /// `None` when the user has no session yet
    pub pending: Option<PendingConversation>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{ActionRequest, ErrorResponse, MessageRequest, PendingResponse, QueuedResponse};
use super::AppState;
use crate::action::Payload;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Inbound events
        .route("/api/users/:user/messages", post(send_message))
        .route("/api/users/:user/actions", post(send_action))
        // Outbound stream and session inspection
        .route("/api/users/:user/stream", get(stream_user))
        .route("/api/users/:user/state", get(get_pending))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Inbound Events
// ============================================================

async fn send_message(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Message text must not be empty".to_string()));
    }

    state
        .sessions
        .dispatch(&user, Payload::Text(req.text))
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(QueuedResponse { queued: true }))
}

async fn send_action(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    if req.tag.is_empty() {
        return Err(AppError::BadRequest("Action tag must not be empty".to_string()));
    }

    state
        .sessions
        .dispatch(&user, Payload::Action(req.tag))
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(QueuedResponse { queued: true }))
}

// ============================================================
// Outbound Stream
// ============================================================

async fn stream_user(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let outbound_rx = state
        .sessions
        .channel()
        .subscribe(&user)
        .map_err(AppError::Internal)?;
    let pending = state.sessions.pending(&user).await;

    tracing::info!(user = %user, "SSE client connected");
    Ok(sse_stream(pending, outbound_rx))
}

async fn get_pending(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Json<PendingResponse> {
    let pending = state.sessions.pending(&user).await;
    Json(PendingResponse { user, pending })
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("qa-exchange ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

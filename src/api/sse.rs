//! Server-Sent Events support

use crate::runtime::Outbound;
use crate::state_machine::PendingConversation;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert a user's outbound broadcast into an SSE stream
///
/// The stream opens with an `init` event carrying the pending conversation.
pub fn sse_stream(
    pending: Option<PendingConversation>,
    outbound_rx: tokio::sync::broadcast::Receiver<Outbound>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init_data = json!({ "type": "init", "pending": pending });
    let init = futures::stream::once(async move {
        Ok(Event::default().event("init").data(init_data.to_string()))
    });

    let outbound = BroadcastStream::new(outbound_rx).filter_map(|result| match result {
        Ok(message) => Some(Ok(outbound_event(&message))),
        Err(e) => {
            tracing::warn!(error = %e, "SSE client lagged, skipping messages");
            None
        }
    });

    Sse::new(init.chain(outbound)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn outbound_event(message: &Outbound) -> Event {
    let event_type = match message {
        Outbound::Text { .. } => "text",
        Outbound::Menu(_) => "menu",
    };
    let data = serde_json::to_string(message).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(event_type).data(data)
}

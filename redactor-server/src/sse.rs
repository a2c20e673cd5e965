//! Server-Sent Events stream of edit progress.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

use crate::state::{AppState, ChangeEvent};

#[derive(Debug, Serialize)]
struct SsePayload<'a> {
    #[serde(rename = "type")]
    event_type: &'static str,
    conversation_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    iter: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confirmation: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a str>,
}

impl<'a> From<&'a ChangeEvent> for SsePayload<'a> {
    fn from(event: &'a ChangeEvent) -> Self {
        match event {
            ChangeEvent::StepApplied {
                conversation_id,
                iter,
                confirmation,
            } => SsePayload {
                event_type: "step_applied",
                conversation_id,
                iter: Some(*iter),
                confirmation: Some(confirmation),
                stop: None,
            },
            ChangeEvent::EditCompleted {
                conversation_id,
                stop,
            } => SsePayload {
                event_type: "edit_completed",
                conversation_id,
                iter: None,
                confirmation: None,
                stop: Some(stop),
            },
        }
    }
}

/// SSE endpoint handler.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.event_tx.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data("{}"));

        loop {
            match rx.recv().await {
                Ok(change_event) => {
                    if let Ok(json) = serde_json::to_string(&SsePayload::from(&change_event)) {
                        yield Ok(Event::default().event("change").data(json));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "SSE client lagged, some events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

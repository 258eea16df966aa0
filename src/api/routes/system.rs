//! System handlers: health, help, events.

use super::{HealthResponse, HelpResponse};
use crate::api::AppState;
use crate::dispatch::STREAMING_EXTENSIONS;
use crate::relay::GREETING;
use crate::types::Event;
use axum::{
    Json,
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

/// GET /health - Liveness and session count
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.relay.is_accepting() {
        "ok"
    } else {
        "shutting_down"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_sessions: state.relay.active_sessions(),
        started_at: state.started_at,
    })
}

/// GET /help - Usage summary
pub async fn help(State(state): State<AppState>) -> Json<HelpResponse> {
    Json(HelpResponse {
        usage: GREETING.to_string(),
        gateway: state.config.resolver.base_url.clone(),
        max_file_size_mb: state.config.transfer.max_file_size_mb,
        streaming_extensions: STREAMING_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        endpoints: ["/health", "/help", "/events"]
            .iter()
            .map(|e| e.to_string())
            .collect(),
    })
}

/// SSE event name for `event`
fn event_name(event: &Event) -> &'static str {
    match event {
        Event::SessionStarted { .. } => "session_started",
        Event::StateChanged { .. } => "state_changed",
        Event::Downloading { .. } => "downloading",
        Event::Completed { .. } => "completed",
        Event::Failed { .. } => "failed",
        Event::Shutdown => "shutdown",
    }
}

/// GET /events - Server-sent events stream of the relay event bus
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let receiver = state.relay.subscribe();
    let stream = BroadcastStream::new(receiver);

    let sse_stream = stream.filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json_data) => Some(Ok(SseEvent::default()
                .event(event_name(&event))
                .data(json_data))),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize event to JSON");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "SSE client lagged");
            Some(Ok(SseEvent::default().event("error").data(format!(
                r#"{{"error":"lagged","skipped":{}}}"#,
                skipped
            ))))
        }
    });

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}

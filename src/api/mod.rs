//! HTTP service running next to the relay
//!
//! Read-only endpoints for operators: health, usage help, and a server-sent
//! event stream mirroring the relay's event bus.

use crate::{Config, Relay, Result};
use axum::{Router, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub mod routes;
pub mod state;

pub use state::AppState;

/// Create the router
///
/// # Routes
///
/// - `GET /health` - Status, version, running sessions, start time
/// - `GET /help` - Usage text and relay limits
/// - `GET /events` - Server-sent events stream
///
/// Request tracing is added when `config.api.debug` is set.
pub fn create_router(relay: Relay, config: Arc<Config>) -> Router {
    let debug = config.api.debug;
    let state = AppState::new(relay, config);

    let router = Router::new()
        .route("/health", get(routes::health_check))
        .route("/help", get(routes::help))
        .route("/events", get(routes::event_stream))
        .with_state(state);

    if debug {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Serve the HTTP service until `cancel` fires
///
/// # Errors
/// Returns [`Error::Io`](crate::Error::Io) if the address cannot be bound, or
/// [`Error::ApiServerError`](crate::Error::ApiServerError) if serving fails.
pub async fn start_api_server(
    relay: Relay,
    config: Arc<Config>,
    cancel: CancellationToken,
) -> Result<()> {
    let bind_address = config.api.bind_address();

    tracing::info!(address = %bind_address, "Starting API server");

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;
    serve(listener, relay, config, cancel).await
}

/// Serve on an already bound listener
pub async fn serve(
    listener: TcpListener,
    relay: Relay,
    config: Arc<Config>,
    cancel: CancellationToken,
) -> Result<()> {
    if let Ok(address) = listener.local_addr() {
        tracing::info!(address = %address, "API server listening");
    }

    let app = create_router(relay, config);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

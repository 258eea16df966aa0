//! # sharelink-relay
//!
//! Relays files behind third-party share links into a chat.
//!
//! Each request runs a short pipeline: resolve the link through a gateway,
//! apply the transfer policy, stream the file to a per-session staging
//! directory, send it back as a playable video or a document, and clean up
//! on every exit path.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sharelink_relay::{Config, run};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env();
//!
//!     // Polls Telegram and serves /health until SIGINT or SIGTERM
//!     run(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! Embedders can drive the pipeline with their own [`Messenger`]:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use sharelink_relay::{Config, InboundMessage, Messenger, Relay};
//! # async fn example(messenger: Arc<dyn Messenger>) -> sharelink_relay::Result<()> {
//! let relay = Relay::new(Config::default(), messenger)?;
//! let mut events = relay.subscribe();
//!
//! relay
//!     .handle_link(InboundMessage {
//!         chat_id: 1,
//!         message_id: 1,
//!         text: "https://1024terabox.com/s/abc".to_string(),
//!     })
//!     .await?;
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP service: health, help, event stream
pub mod api;
/// Telegram long-polling front end
pub mod bot;
/// Configuration types
pub mod config;
/// Delivery mode selection and upload
pub mod dispatch;
/// Error types
pub mod error;
/// Streaming download into staging
pub mod fetcher;
/// Transfer policy checks
pub mod gate;
/// Outbound messaging seam and Telegram transport
pub mod messenger;
/// Request intake and session supervision
pub mod relay;
/// Share link resolution
pub mod resolver;
/// Per-request state machine
pub mod session;
/// Transient per-session storage
pub mod staging;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, GatewayError, PolicyRejection, Result};
pub use messenger::{Messenger, OutboundFile, TelegramMessenger};
pub use relay::Relay;
pub use session::{SessionOutcome, TransferSession};
pub use types::{
    DeliveryMode, Event, FileDescriptor, InboundMessage, MessageRef, ResolutionResult,
    SessionId, SessionState, ShareLink,
};

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run the Telegram relay and its HTTP service until a termination signal
///
/// On SIGINT/SIGTERM polling and the HTTP service stop, then running
/// sessions are allowed to finish before this returns.
///
/// # Errors
/// Returns a configuration error if `config` is not usable for the bot.
pub async fn run(config: Config) -> Result<()> {
    config.validate_for_bot()?;

    let telegram = TelegramMessenger::new(&config.telegram)?;
    let relay = Relay::new(config.clone(), Arc::new(telegram.clone()))?;
    let config = Arc::new(config);
    let cancel = CancellationToken::new();

    let api_server = tokio::spawn(api::start_api_server(
        relay.clone(),
        config.clone(),
        cancel.clone(),
    ));
    let poller = tokio::spawn(bot::run_polling(relay.clone(), telegram, cancel.clone()));

    wait_for_signal().await;
    cancel.cancel();

    for (name, task) in [("polling", poller), ("api server", api_server)] {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(task = name, error = %e, "task failed"),
            Err(e) => tracing::error!(task = name, error = %e, "task panicked"),
        }
    }

    relay.shutdown().await;
    Ok(())
}

/// Wait for SIGTERM or SIGINT
///
/// If one handler cannot be registered (some containers forbid it) the other
/// still works; with neither, Ctrl+C via `tokio::signal::ctrl_c` is used.
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            let name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            tracing::info!(signal = name, "shutdown requested");
        }
        (Ok(mut remaining), Err(e)) | (Err(e), Ok(mut remaining)) => {
            tracing::warn!(error = %e, "signal handler unavailable, listening for the other one");
            remaining.recv().await;
            tracing::info!("shutdown requested");
        }
        (Err(e), Err(_)) => {
            tracing::warn!(error = %e, "no signal handlers, falling back to ctrl_c");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for ctrl_c");
            }
        }
    }
}

/// Wait for Ctrl+C
#[cfg(not(unix))]
pub async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!(signal = "ctrl_c", "shutdown requested"),
        Err(e) => tracing::error!(error = %e, "cannot listen for ctrl_c"),
    }
}

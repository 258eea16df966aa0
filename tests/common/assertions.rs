//! Event-bus assertions for integration tests

use std::time::Duration;
use tokio::sync::broadcast;
use sharelink_relay::{DeliveryMode, Event, SessionState};

/// How a session ended, as seen on the event bus
#[derive(Debug, PartialEq)]
pub enum Terminal {
    /// File delivered
    Completed {
        /// Delivered file name
        filename: String,
        /// Bytes delivered
        size_bytes: u64,
        /// Delivery mode used
        mode: DeliveryMode,
    },
    /// Session failed
    Failed {
        /// State the failure happened in
        state: SessionState,
        /// Machine-readable error code
        code: String,
    },
    /// Timeout waiting for a terminal event
    Timeout,
    /// Event bus closed unexpectedly
    ChannelClosed,
}

/// Wait for the first session to finish, one way or the other
pub async fn wait_for_terminal(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
) -> Terminal {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::Completed {
                    filename,
                    size_bytes,
                    mode,
                    ..
                }) => {
                    return Terminal::Completed {
                        filename,
                        size_bytes,
                        mode,
                    };
                }
                Ok(Event::Failed { state, code, .. }) => {
                    return Terminal::Failed { state, code };
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return Terminal::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(Terminal::Timeout)
}

/// Whether `root` holds no staged files or session directories
pub fn staging_is_empty(root: &std::path::Path) -> bool {
    match std::fs::read_dir(root) {
        Ok(mut entries) => entries.next().is_none(),
        Err(e) => e.kind() == std::io::ErrorKind::NotFound,
    }
}

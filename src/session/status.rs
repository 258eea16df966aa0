//! The single editable status message of a session and its progress reporter.

use crate::error::Result;
use crate::messenger::Messenger;
use crate::types::{Event, MessageRef, SessionId, TransferProgress};
use crate::utils::{format_bytes, format_mb};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::warn;

/// Shown while the gateway is being asked for the direct link
pub const RESOLVING_TEXT: &str = "🔍 Fetching direct link from gateway...";

/// Shown once every byte is staged and the upload starts
pub const SENDING_TEXT: &str = "✅ Download done! Sending to you...";

/// Header shown for the whole download phase
pub fn downloading_text(filename: &str, size_bytes: u64) -> String {
    format!("📥 {} ({} MB)\nDownloading...", filename, format_mb(size_bytes))
}

/// Download header followed by a percentage, or a byte count when the total is unknown
pub fn progress_text(header: &str, progress: TransferProgress) -> String {
    match progress.percent() {
        Some(percent) => format!("{} {:.0}%", header, percent),
        None => format!("{} {}", header, format_bytes(progress.downloaded)),
    }
}

/// Owned handle to the one status message of a session
///
/// Not `Clone`: the session holds it and lends it out, so at most one task
/// edits the message at a time. [`delete`](Self::delete) consumes it.
pub(crate) struct StatusHandle {
    messenger: Arc<dyn Messenger>,
    message: MessageRef,
    text: String,
}

impl StatusHandle {
    /// Send the status message as a reply to `request`
    pub(crate) async fn open(
        messenger: Arc<dyn Messenger>,
        request: MessageRef,
        text: &str,
    ) -> Result<Self> {
        let message = messenger
            .send_status(request.chat_id, request.message_id, text)
            .await?;
        Ok(Self {
            messenger,
            message,
            text: text.to_string(),
        })
    }

    /// Rewrite the message; identical text is not sent again
    pub(crate) async fn set(&mut self, text: &str) -> Result<()> {
        if self.text == text {
            return Ok(());
        }
        self.messenger.edit_status(&self.message, text).await?;
        self.text = text.to_string();
        Ok(())
    }

    /// Like [`set`](Self::set), but a failed edit is only logged
    pub(crate) async fn set_or_warn(&mut self, text: &str, session: SessionId) {
        if let Err(e) = self.set(text).await {
            warn!(
                session_id = session.0,
                chat_id = self.message.chat_id,
                error = %e,
                "failed to update status message"
            );
        }
    }

    /// Remove the message
    pub(crate) async fn delete(self) -> Result<()> {
        self.messenger.delete_status(&self.message).await
    }

    /// Text last shown successfully
    #[cfg(test)]
    pub(crate) fn text(&self) -> &str {
        &self.text
    }
}

/// Mirror download progress into the status message until the sender is dropped
///
/// Edits and [`Event::Downloading`] are throttled to one per `interval`. The
/// fetcher never waits on this loop: it only replaces the watch value, and a
/// slow or failing edit just means fewer updates. A snapshot held back by the
/// throttle is still shown once the sender is gone, so the last figure the
/// user sees is the final one.
pub(crate) async fn report_progress(
    status: &mut StatusHandle,
    mut progress: watch::Receiver<TransferProgress>,
    header: &str,
    interval: Duration,
    session: SessionId,
    events: &broadcast::Sender<Event>,
) {
    let mut last_report: Option<Instant> = None;
    let mut held_back = false;

    while progress.changed().await.is_ok() {
        if last_report.is_some_and(|at| at.elapsed() < interval) {
            held_back = true;
            continue;
        }
        last_report = Some(Instant::now());
        held_back = false;

        let snapshot = *progress.borrow_and_update();
        publish_progress(status, header, snapshot, session, events).await;
    }

    if held_back {
        let snapshot = *progress.borrow();
        publish_progress(status, header, snapshot, session, events).await;
    }
}

async fn publish_progress(
    status: &mut StatusHandle,
    header: &str,
    snapshot: TransferProgress,
    session: SessionId,
    events: &broadcast::Sender<Event>,
) {
    events
        .send(Event::Downloading {
            id: session,
            downloaded: snapshot.downloaded,
            total: snapshot.total,
        })
        .ok();
    status
        .set_or_warn(&progress_text(header, snapshot), session)
        .await;
}

//! Delivery of a staged file back to the requesting chat.

use crate::error::{Error, Result};
use crate::messenger::{Messenger, OutboundFile};
use crate::staging::StagingFile;
use crate::types::{DeliveryMode, MessageRef};
use crate::utils::{extension_lowercase, format_mb};
use std::sync::Arc;
use tracing::info;

/// Extensions sent as playable video; everything else goes out as a document
pub const STREAMING_EXTENSIONS: [&str; 5] = ["mp4", "mkv", "mov", "avi", "webm"];

/// Pick the delivery mode from the file name's extension (case-insensitive)
///
/// # Examples
///
/// ```
/// use sharelink_relay::dispatch::classify;
/// use sharelink_relay::types::DeliveryMode;
///
/// assert_eq!(classify("Holiday.MKV"), DeliveryMode::StreamingMedia);
/// assert_eq!(classify("notes.pdf"), DeliveryMode::Document);
/// ```
#[must_use]
pub fn classify(filename: &str) -> DeliveryMode {
    match extension_lowercase(filename) {
        Some(ext) if STREAMING_EXTENSIONS.contains(&ext.as_str()) => DeliveryMode::StreamingMedia,
        _ => DeliveryMode::Document,
    }
}

/// Caption attached to every delivered file
#[must_use]
pub fn caption(filename: &str, size_bytes: u64, source_label: &str) -> String {
    format!(
        "{} ({} MB) from {}",
        filename,
        format_mb(size_bytes),
        source_label
    )
}

/// Sends staged files through a [`Messenger`]
#[derive(Clone)]
pub struct Dispatcher {
    messenger: Arc<dyn Messenger>,
    source_label: String,
}

impl Dispatcher {
    /// Create a dispatcher that labels captions with `source_label`
    pub fn new(messenger: Arc<dyn Messenger>, source_label: impl Into<String>) -> Self {
        Self {
            messenger,
            source_label: source_label.into(),
        }
    }

    /// Send `staging` as a reply to `reply_to`
    ///
    /// `filename` and `size_bytes` come from the resolved descriptor and feed
    /// the mode choice and the caption. The upload itself is named after the
    /// staged file.
    ///
    /// # Errors
    /// Any messenger failure is reported as [`Error::DeliveryFailed`]
    pub async fn dispatch(
        &self,
        staging: &StagingFile,
        filename: &str,
        size_bytes: u64,
        reply_to: MessageRef,
    ) -> Result<DeliveryMode> {
        let mode = classify(filename);
        let file = OutboundFile {
            path: staging.path().to_path_buf(),
            filename: staging.filename().to_string(),
            size_bytes: staging.len(),
            caption: caption(filename, size_bytes, &self.source_label),
            reply_to,
        };

        let sent = match mode {
            DeliveryMode::StreamingMedia => self.messenger.send_streaming_media(&file).await,
            DeliveryMode::Document => self.messenger.send_document(&file).await,
        };
        sent.map_err(|e| Error::DeliveryFailed {
            reason: e.to_string(),
        })?;

        info!(
            chat_id = reply_to.chat_id,
            filename = %file.filename,
            mode = ?mode,
            messenger = self.messenger.name(),
            "file delivered"
        );
        Ok(mode)
    }
}

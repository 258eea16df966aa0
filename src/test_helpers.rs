//! Shared test doubles for sessions, the relay and the front end.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::messenger::{Messenger, OutboundFile};
use crate::types::MessageRef;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

/// One messenger call as observed by [`RecordingMessenger`]
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    Status {
        chat_id: i64,
        reply_to: i64,
        text: String,
        assigned: MessageRef,
    },
    Edit {
        status: MessageRef,
        text: String,
    },
    Delete(MessageRef),
    StreamingMedia(OutboundFile),
    Document(OutboundFile),
    Text {
        chat_id: i64,
        reply_to: Option<i64>,
        text: String,
    },
}

/// In-memory [`Messenger`] that records every call in order
///
/// Uploads read the staged file at call time so tests can compare the bytes
/// that would have gone out after the staging file is gone.
pub(crate) struct RecordingMessenger {
    calls: Mutex<Vec<Call>>,
    uploads: Mutex<Vec<Vec<u8>>>,
    next_message_id: AtomicI64,
    fail_uploads: bool,
    fail_edits: bool,
    fail_status: bool,
}

impl RecordingMessenger {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            next_message_id: AtomicI64::new(1000),
            fail_uploads: false,
            fail_edits: false,
            fail_status: false,
        }
    }

    /// Make every upload fail with a messaging error
    pub(crate) fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    /// Make every status edit fail with a messaging error
    pub(crate) fn failing_edits(mut self) -> Self {
        self.fail_edits = true;
        self
    }

    /// Make sending the initial status message fail
    pub(crate) fn failing_status(mut self) -> Self {
        self.fail_status = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn uploads(&self) -> Vec<Vec<u8>> {
        self.uploads.lock().unwrap().clone()
    }

    /// Texts of every edit, in order
    pub(crate) fn edits(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Edit { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Texts of every plain reply, in order
    pub(crate) fn texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn status_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Status { .. }))
            .count()
    }

    pub(crate) fn upload_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::StreamingMedia(_) | Call::Document(_)))
            .count()
    }

    pub(crate) fn deleted(&self) -> bool {
        self.calls().iter().any(|c| matches!(c, Call::Delete(_)))
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn capture_upload(&self, file: &OutboundFile) -> Result<()> {
        if self.fail_uploads {
            return Err(Error::Messaging("upload rejected".to_string()));
        }
        let bytes = tokio::fs::read(&file.path).await?;
        self.uploads.lock().unwrap().push(bytes);
        Ok(())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_status(&self, chat_id: i64, reply_to: i64, text: &str) -> Result<MessageRef> {
        if self.fail_status {
            return Err(Error::Messaging("chat not found".to_string()));
        }
        let assigned = MessageRef {
            chat_id,
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
        };
        self.record(Call::Status {
            chat_id,
            reply_to,
            text: text.to_string(),
            assigned,
        });
        Ok(assigned)
    }

    async fn edit_status(&self, status: &MessageRef, text: &str) -> Result<()> {
        self.record(Call::Edit {
            status: *status,
            text: text.to_string(),
        });
        if self.fail_edits {
            return Err(Error::Messaging("message can't be edited".to_string()));
        }
        Ok(())
    }

    async fn delete_status(&self, status: &MessageRef) -> Result<()> {
        self.record(Call::Delete(*status));
        Ok(())
    }

    async fn send_streaming_media(&self, file: &OutboundFile) -> Result<()> {
        self.record(Call::StreamingMedia(file.clone()));
        self.capture_upload(file).await
    }

    async fn send_document(&self, file: &OutboundFile) -> Result<()> {
        self.record(Call::Document(file.clone()));
        self.capture_upload(file).await
    }

    async fn send_text(&self, chat_id: i64, reply_to: Option<i64>, text: &str) -> Result<()> {
        self.record(Call::Text {
            chat_id,
            reply_to,
            text: text.to_string(),
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Config pointing the resolver at `gateway_uri` and staging under `staging_root`
pub(crate) fn test_config(gateway_uri: &str, staging_root: &Path) -> Config {
    let mut config = Config::default();
    config.resolver.base_url = format!("{}/api", gateway_uri);
    config.transfer.staging_dir = staging_root.to_path_buf();
    config.transfer.chunk_size = 64 * 1024;
    config
}

/// Whether `root` holds no staged files or session directories
pub(crate) fn staging_is_empty(root: &Path) -> bool {
    match std::fs::read_dir(root) {
        Ok(mut entries) => entries.next().is_none(),
        Err(e) => e.kind() == std::io::ErrorKind::NotFound,
    }
}

//! Outbound messaging seam
//!
//! Sessions talk to the chat platform only through the [`Messenger`] trait, so
//! the state machine can be driven by [`TelegramMessenger`] in production and
//! by an in-memory recorder in tests.

use crate::error::Result;
use crate::types::MessageRef;
use async_trait::async_trait;
use std::path::PathBuf;

mod telegram;

pub use telegram::{TelegramMessenger, Update};

/// A staged file ready to be sent to a chat
#[derive(Clone, Debug, PartialEq)]
pub struct OutboundFile {
    /// Staged bytes on disk
    pub path: PathBuf,
    /// File name shown to the recipient
    pub filename: String,
    /// Size of the staged bytes
    pub size_bytes: u64,
    /// Caption attached to the upload
    pub caption: String,
    /// Message the upload replies to (also selects the chat)
    pub reply_to: MessageRef,
}

/// Operations the relay needs from a chat platform
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a status message replying to `reply_to` and return its reference
    async fn send_status(&self, chat_id: i64, reply_to: i64, text: &str) -> Result<MessageRef>;

    /// Rewrite a status message in place
    async fn edit_status(&self, status: &MessageRef, text: &str) -> Result<()>;

    /// Remove a status message
    async fn delete_status(&self, status: &MessageRef) -> Result<()>;

    /// Upload a video flagged for progressive playback
    async fn send_streaming_media(&self, file: &OutboundFile) -> Result<()>;

    /// Upload a generic document attachment
    async fn send_document(&self, file: &OutboundFile) -> Result<()>;

    /// Send a plain reply that is never edited afterwards
    async fn send_text(&self, chat_id: i64, reply_to: Option<i64>, text: &str) -> Result<()>;

    /// Short platform name for logs
    fn name(&self) -> &'static str;
}

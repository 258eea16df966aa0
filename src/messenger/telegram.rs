//! Telegram Bot API transport over reqwest

use super::{Messenger, OutboundFile};
use crate::config::TelegramConfig;
use crate::error::{Error, Result};
use crate::types::{InboundMessage, MessageRef};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Ceiling for plain JSON calls; uploads are only bounded by the connect timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Slack on top of the long-poll timeout before the HTTP request gives up
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Envelope every Bot API method answers with
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T> {
        if !self.ok {
            return Err(Error::Messaging(format!(
                "{} failed ({}): {}",
                method,
                self.error_code.unwrap_or_default(),
                self.description.as_deref().unwrap_or("no description")
            )));
        }
        self.result
            .ok_or_else(|| Error::Messaging(format!("{} returned no result", method)))
    }
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
    chat: Chat,
}

#[derive(Clone, Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Clone, Debug, Deserialize)]
struct IncomingMessage {
    message_id: i64,
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

/// One entry returned by `getUpdates`
///
/// Only text messages are kept; everything else deserializes with an empty
/// payload and is skipped by [`Update::into_inbound`].
#[derive(Clone, Debug, Deserialize)]
pub struct Update {
    /// Monotonic update ID used to acknowledge updates via the next offset
    pub update_id: i64,
    #[serde(default)]
    message: Option<IncomingMessage>,
}

impl Update {
    /// Text message carried by this update, if any
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let message = self.message?;
        let text = message.text?;
        Some(InboundMessage {
            chat_id: message.chat.id,
            message_id: message.message_id,
            text,
        })
    }
}

/// [`Messenger`] backed by the Telegram Bot API
#[derive(Clone)]
pub struct TelegramMessenger {
    client: reqwest::Client,
    /// `<api_base>/bot<token>`; never logged
    endpoint: String,
}

impl std::fmt::Debug for TelegramMessenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramMessenger").finish_non_exhaustive()
    }
}

impl TelegramMessenger {
    /// Create a client for the configured bot
    ///
    /// # Errors
    /// Returns a configuration error when no token is set
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let token = config
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::config("bot token is not set", "TELEGRAM_TOKEN"))?;

        let client = reqwest::Client::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::Io(std::io::Error::other(format!(
                    "Failed to create HTTP client: {}",
                    e
                )))
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}", config.api_base.trim_end_matches('/'), token),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.endpoint, method)
    }

    async fn decode<T: DeserializeOwned>(method: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(e.without_url()))?;
        let envelope: ApiResponse<T> = serde_json::from_slice(&body).map_err(|_| {
            Error::Messaging(format!(
                "{} answered HTTP {} without a valid body",
                method, status
            ))
        })?;
        envelope.into_result(method)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, payload: Value) -> Result<T> {
        self.call_with_timeout(method, payload, REQUEST_TIMEOUT).await
    }

    async fn call_with_timeout<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Network(e.without_url()))?;
        Self::decode(method, response).await
    }

    async fn upload(
        &self,
        method: &str,
        field: &str,
        file: &OutboundFile,
        streaming: bool,
    ) -> Result<()> {
        let handle = tokio::fs::File::open(&file.path).await?;
        let part = Part::stream_with_length(
            reqwest::Body::wrap_stream(ReaderStream::new(handle)),
            file.size_bytes,
        )
        .file_name(file.filename.clone());

        let mut form = Form::new()
            .text("chat_id", file.reply_to.chat_id.to_string())
            .text("reply_to_message_id", file.reply_to.message_id.to_string())
            .text("caption", file.caption.clone())
            .part(field.to_string(), part);
        if streaming {
            form = form.text("supports_streaming", "true");
        }

        debug!(method, filename = %file.filename, size = file.size_bytes, "uploading file");

        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Network(e.without_url()))?;
        let _: Value = Self::decode(method, response).await?;
        Ok(())
    }

    async fn send_message(
        &self,
        chat_id: i64,
        reply_to: Option<i64>,
        text: &str,
    ) -> Result<MessageRef> {
        let mut payload = json!({"chat_id": chat_id, "text": text});
        if let Some(reply_to) = reply_to {
            payload["reply_to_message_id"] = json!(reply_to);
            payload["allow_sending_without_reply"] = json!(true);
        }
        let sent: SentMessage = self.call("sendMessage", payload).await?;
        Ok(MessageRef {
            chat_id: sent.chat.id,
            message_id: sent.message_id,
        })
    }

    /// Long-poll for updates after `offset`
    ///
    /// The server holds the request for up to `timeout` when nothing is pending.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>> {
        let mut payload = json!({
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            payload["offset"] = json!(offset);
        }
        self.call_with_timeout("getUpdates", payload, timeout + POLL_GRACE)
            .await
    }

    /// Offset that skips every update queued before now
    ///
    /// Returns `None` when nothing is pending.
    pub async fn pending_offset(&self) -> Result<Option<i64>> {
        let updates: Vec<Update> = self
            .call("getUpdates", json!({"offset": -1, "timeout": 0}))
            .await?;
        Ok(updates.last().map(|u| u.update_id + 1))
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_status(&self, chat_id: i64, reply_to: i64, text: &str) -> Result<MessageRef> {
        self.send_message(chat_id, Some(reply_to), text).await
    }

    async fn edit_status(&self, status: &MessageRef, text: &str) -> Result<()> {
        // Answers with the edited message or `true`; neither is needed
        let _: Value = self
            .call(
                "editMessageText",
                json!({
                    "chat_id": status.chat_id,
                    "message_id": status.message_id,
                    "text": text,
                }),
            )
            .await?;
        Ok(())
    }

    async fn delete_status(&self, status: &MessageRef) -> Result<()> {
        let _: bool = self
            .call(
                "deleteMessage",
                json!({"chat_id": status.chat_id, "message_id": status.message_id}),
            )
            .await?;
        Ok(())
    }

    async fn send_streaming_media(&self, file: &OutboundFile) -> Result<()> {
        self.upload("sendVideo", "video", file, true).await
    }

    async fn send_document(&self, file: &OutboundFile) -> Result<()> {
        self.upload("sendDocument", "document", file, false).await
    }

    async fn send_text(&self, chat_id: i64, reply_to: Option<i64>, text: &str) -> Result<()> {
        self.send_message(chat_id, reply_to, text).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

//! Mock Bot API, gateway and origin servers wired to a relay

use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use sharelink_relay::Config;

/// Bot token used against the mock Bot API
pub const TOKEN: &str = "123:test-token";

/// Share link every fixture resolves
pub const LINK: &str = "https://1024terabox.com/s/1abcdef";

/// Chat the test requests come from
pub const CHAT_ID: i64 = 42;

/// One mebibyte
pub const MB: u64 = 1024 * 1024;

/// The three remote parties a relay talks to
pub struct Remotes {
    /// Telegram Bot API
    pub bot_api: MockServer,
    /// Resolution gateway
    pub gateway: MockServer,
    /// Origin host serving the file bytes
    pub origin: MockServer,
    /// Staging root, removed on drop
    pub staging: TempDir,
}

impl Remotes {
    /// Start all mock servers and mount the Bot API methods the relay calls
    pub async fn start() -> Self {
        let remotes = Self {
            bot_api: MockServer::start().await,
            gateway: MockServer::start().await,
            origin: MockServer::start().await,
            staging: tempfile::tempdir().expect("create staging dir"),
        };
        remotes.mount_bot_api().await;
        remotes
    }

    async fn mount_bot_api(&self) {
        let sent = json!({"ok": true, "result": {"message_id": 500, "chat": {"id": CHAT_ID}}});

        for method_name in ["sendMessage", "sendVideo", "sendDocument"] {
            Mock::given(method("POST"))
                .and(path(format!("/bot{}/{}", TOKEN, method_name)))
                .respond_with(ResponseTemplate::new(200).set_body_json(sent.clone()))
                .mount(&self.bot_api)
                .await;
        }
        for method_name in ["editMessageText", "deleteMessage"] {
            Mock::given(method("POST"))
                .and(path(format!("/bot{}/{}", TOKEN, method_name)))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": true})),
                )
                .mount(&self.bot_api)
                .await;
        }
    }

    /// Relay configuration pointing at the mock servers
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.telegram.token = Some(TOKEN.to_string());
        config.telegram.api_base = self.bot_api.uri();
        config.telegram.poll_timeout = Duration::ZERO;
        config.telegram.drop_pending_updates = false;
        config.resolver.base_url = format!("{}/api", self.gateway.uri());
        config.transfer.staging_dir = self.staging.path().to_path_buf();
        config.transfer.chunk_size = 64 * 1024;
        config.transfer.progress_interval = Duration::ZERO;
        config
    }

    /// Gateway answers [`LINK`] with a single file served by the origin
    pub async fn gateway_resolves(&self, filename: &str, size_bytes: u64) {
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("url", LINK))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "files": [{
                    "filename": filename,
                    "size_bytes": size_bytes,
                    "download_link": format!("{}/file", self.origin.uri()),
                }]
            })))
            .mount(&self.gateway)
            .await;
    }

    /// Origin serves `body`, expected exactly `times` times
    pub async fn origin_serves(&self, body: Vec<u8>, times: u64) {
        Mock::given(method("GET"))
            .and(path("/file"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .expect(times)
            .mount(&self.origin)
            .await;
    }

    /// Requests the Bot API received for `method_name`
    pub async fn bot_calls(&self, method_name: &str) -> Vec<Request> {
        let suffix = format!("/{}", method_name);
        self.bot_api
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path().ends_with(&suffix))
            .collect()
    }
}

/// Deterministic file body of `len` bytes
pub fn file_body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Whether `haystack` contains `needle` as a contiguous slice
pub fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}


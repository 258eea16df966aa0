//! Configuration types for sharelink-relay

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// One MiB, the unit the size ceiling and captions are expressed in
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Resolution gateway settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Base URL of the resolution endpoint (default: "http://localhost:5000/api")
    ///
    /// The share link is appended as the `url` query parameter.
    #[serde(default = "default_resolver_base_url")]
    pub base_url: String,

    /// Request timeout for the whole resolution call (default: 45 seconds)
    #[serde(default = "default_resolver_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: default_resolver_base_url(),
            timeout: default_resolver_timeout(),
        }
    }
}

/// Transfer behavior (size ceiling, staging, chunking, progress)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Largest file accepted, in MiB (default: 1800)
    ///
    /// Kept below the ~2048 MB ceiling the messaging platform enforces on uploads.
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: f64,

    /// Directory that holds per-session staging files (default: "<temp>/sharelink-relay")
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Size of each body read during the streaming download (default: 512 KiB)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Connection-establishment timeout for the origin download (default: 30 seconds)
    ///
    /// The body itself has no read timeout; large files may take arbitrarily long.
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Minimum delay between progress edits of the status message (default: 3 seconds)
    #[serde(default = "default_progress_interval", with = "duration_serde")]
    pub progress_interval: Duration,

    /// Source name appended to captions, as in "clip.mp4 (50.0 MB) from Terabox"
    #[serde(default = "default_source_label")]
    pub source_label: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
            staging_dir: default_staging_dir(),
            chunk_size: default_chunk_size(),
            connect_timeout: default_connect_timeout(),
            progress_interval: default_progress_interval(),
            source_label: default_source_label(),
        }
    }
}

/// Share link recognition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Case-insensitive substrings that mark a text as a candidate share link
    #[serde(default = "default_host_markers")]
    pub host_markers: Vec<String>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            host_markers: default_host_markers(),
        }
    }
}

/// Telegram Bot API settings for the polling front end and outbound transport
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token (required to run the bot, never logged)
    #[serde(default)]
    pub token: Option<String>,

    /// Bot API base URL (default: "https://api.telegram.org")
    ///
    /// Point this at a self-hosted Bot API server to upload files above 50 MB.
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    /// Long-poll timeout for getUpdates (default: 30 seconds)
    #[serde(default = "default_poll_timeout", with = "duration_serde")]
    pub poll_timeout: Duration,

    /// Skip updates that queued up while the bot was offline (default: true)
    #[serde(default = "default_true")]
    pub drop_pending_updates: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: default_telegram_api_base(),
            poll_timeout: default_poll_timeout(),
            drop_pending_updates: true,
        }
    }
}

/// Sibling HTTP service settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind host (default: 0.0.0.0)
    #[serde(default = "default_api_host")]
    pub host: IpAddr,

    /// Bind port (default: 5000)
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Enables request tracing and debug-level logs (default: false)
    #[serde(default)]
    pub debug: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            debug: false,
        }
    }
}

impl ApiConfig {
    /// Socket address the HTTP service binds to
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Main configuration for the relay
///
/// Fields are organized into logical sub-configs:
/// - [`resolver`](ResolverConfig): resolution gateway
/// - [`transfer`](TransferConfig): size ceiling, staging, chunking
/// - [`links`](LinkConfig): share link recognition
/// - [`telegram`](TelegramConfig): Bot API front end and transport
/// - [`api`](ApiConfig): sibling HTTP service
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Resolution gateway settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Transfer behavior
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Share link recognition
    #[serde(default)]
    pub links: LinkConfig,

    /// Telegram Bot API settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Sibling HTTP service settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Load configuration from process environment variables
    ///
    /// Recognized variables: `GATEWAY_URL`, `GATEWAY_TIMEOUT_SECS`, `MAX_FILE_SIZE_MB`,
    /// `STAGING_DIR`, `TELEGRAM_TOKEN`, `TELEGRAM_API_BASE`, `HOST`, `PORT`, `DEBUG`
    /// (`FLASK_DEBUG` is accepted as an older spelling).
    /// Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(url) = get("GATEWAY_URL") {
            config.resolver.base_url = url;
        }
        if let Some(secs) = get("GATEWAY_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            config.resolver.timeout = Duration::from_secs(secs);
        }
        if let Some(mb) = get("MAX_FILE_SIZE_MB").and_then(|v| v.parse::<f64>().ok()) {
            config.transfer.max_file_size_mb = mb;
        }
        if let Some(dir) = get("STAGING_DIR") {
            config.transfer.staging_dir = PathBuf::from(dir);
        }
        if let Some(token) = get("TELEGRAM_TOKEN") {
            config.telegram.token = Some(token);
        }
        if let Some(base) = get("TELEGRAM_API_BASE") {
            config.telegram.api_base = base;
        }
        if let Some(host) = get("HOST").and_then(|v| v.parse::<IpAddr>().ok()) {
            config.api.host = host;
        }
        if let Some(port) = get("PORT").and_then(|v| v.parse::<u16>().ok()) {
            config.api.port = port;
        }
        if let Some(debug) = get("DEBUG").or_else(|| get("FLASK_DEBUG")) {
            config.api.debug = parse_flag(&debug);
        }

        config
    }

    /// Check the settings the relay pipeline depends on
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.resolver.base_url).map_err(|e| {
            Error::config(
                format!("invalid resolver URL '{}': {}", self.resolver.base_url, e),
                "GATEWAY_URL",
            )
        })?;

        let ceiling = self.transfer.max_file_size_mb;
        if ceiling.is_nan() || ceiling <= 0.0 {
            return Err(Error::config(
                "size ceiling must be a positive number of MB",
                "MAX_FILE_SIZE_MB",
            ));
        }

        if self.transfer.chunk_size == 0 {
            return Err(Error::config("chunk size must be non-zero", "chunk_size"));
        }

        if self.links.host_markers.iter().all(|m| m.trim().is_empty()) {
            return Err(Error::config(
                "at least one share link host marker is required",
                "host_markers",
            ));
        }

        Ok(())
    }

    /// [`validate`](Self::validate) plus the settings the Telegram front end needs
    pub fn validate_for_bot(&self) -> Result<()> {
        self.validate()?;

        match self.telegram.token.as_deref() {
            Some(token) if !token.trim().is_empty() => {}
            _ => {
                return Err(Error::config(
                    "a bot token is required to run the Telegram front end",
                    "TELEGRAM_TOKEN",
                ));
            }
        }

        url::Url::parse(&self.telegram.api_base).map_err(|e| {
            Error::config(
                format!("invalid Bot API base '{}': {}", self.telegram.api_base, e),
                "TELEGRAM_API_BASE",
            )
        })?;

        Ok(())
    }
}

/// Interpret "1", "true" and "yes" (any case) as enabled
fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn default_resolver_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_resolver_timeout() -> Duration {
    Duration::from_secs(45)
}

fn default_max_file_size_mb() -> f64 {
    1800.0
}

fn default_staging_dir() -> PathBuf {
    std::env::temp_dir().join("sharelink-relay")
}

fn default_chunk_size() -> usize {
    512 * 1024
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_progress_interval() -> Duration {
    Duration::from_secs(3)
}

fn default_source_label() -> String {
    "Terabox".to_string()
}

fn default_host_markers() -> Vec<String> {
    vec!["terabox".to_string(), "1024terabox".to_string()]
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_api_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_api_port() -> u16 {
    5000
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

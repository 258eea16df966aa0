//! Error types for sharelink-relay
//!
//! This module provides the error taxonomy for the relay pipeline:
//! - Domain-specific error types (gateway, transfer policy, download, delivery)
//! - Human-readable status texts shown to the requester ([`Error::user_message`])
//! - Machine-readable error codes for structured logs and events ([`Error::error_code`])

use thiserror::Error;

/// Result type alias for sharelink-relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown when a text does not look like a supported share link
pub const INVALID_LINK_MESSAGE: &str = "Please send a valid Terabox link 😊";

/// Main error type for sharelink-relay
///
/// Every variant is terminal for the session that produced it. None of them
/// triggers an automatic retry; the session renders [`Error::user_message`]
/// into its status message and ends.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "GATEWAY_URL")
        key: Option<String>,
    },

    /// The resolution gateway failed or answered with something unusable
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The gateway answered, but reported failure or returned no files
    #[error("no file info in resolution result")]
    NoFileInfo,

    /// The resolved file was rejected before any bytes moved
    #[error("transfer rejected: {0}")]
    Policy(#[from] PolicyRejection),

    /// The direct-download origin answered with a non-success status
    #[error("download failed with HTTP {status}")]
    DownloadFailed {
        /// HTTP status code returned by the origin
        status: u16,
    },

    /// The outbound send of the staged file failed
    #[error("delivery failed: {reason}")]
    DeliveryFailed {
        /// Why the messaging endpoint refused or lost the upload
        reason: String,
    },

    /// Inbound text does not contain a recognized host marker
    #[error("not a recognized share link")]
    InvalidLink,

    /// Messaging transport error (Bot API envelope with `ok=false`, etc.)
    #[error("messaging error: {0}")]
    Messaging(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTTP service error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Shutdown in progress - not accepting new links
    #[error("shutdown in progress: not accepting new links")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Failures talking to the resolution gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Gateway answered with a non-2xx status
    #[error("gateway returned HTTP {status}")]
    Status {
        /// HTTP status code returned by the gateway
        status: u16,
    },

    /// Gateway body was not the expected JSON document
    #[error("gateway response could not be parsed: {reason}")]
    Parse {
        /// Decoder error text
        reason: String,
    },

    /// Gateway could not be reached or did not answer within the timeout
    #[error("gateway unreachable: {reason}")]
    Unreachable {
        /// Transport error text
        reason: String,
    },
}

/// Transfer policy rejections raised by the gate
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyRejection {
    /// Share link resolved to more than one file
    #[error("share link resolved to {count} files, only single files are supported")]
    UnsupportedFolder {
        /// Number of file descriptors the gateway returned
        count: usize,
    },

    /// The selected descriptor carries no direct download link
    #[error("no direct download link")]
    NoDirectLink,

    /// The file exceeds the configured size ceiling
    #[error("file is {size_mb:.1} MB, ceiling is {ceiling_mb:.1} MB")]
    FileTooLarge {
        /// Size of the file in MiB
        size_mb: f64,
        /// Configured ceiling in MiB
        ceiling_mb: f64,
    },
}

impl Error {
    /// Build a configuration error for a specific key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Text written into the requester's status message when a session ends with this error
    pub fn user_message(&self) -> String {
        match self {
            Error::Gateway(GatewayError::Status { status }) => {
                format!("Gateway returned error: {}", status)
            }
            Error::Gateway(GatewayError::Parse { .. }) => {
                "Gateway returned an unreadable response.".to_string()
            }
            Error::Gateway(GatewayError::Unreachable { reason }) => {
                format!("Gateway unreachable: {}", reason)
            }
            Error::NoFileInfo => {
                "❌ Couldn't get file info. Link invalid or cookie expired?".to_string()
            }
            Error::Policy(PolicyRejection::UnsupportedFolder { .. }) => {
                "This is a folder — only single files supported for now.".to_string()
            }
            Error::Policy(PolicyRejection::NoDirectLink) => {
                "No direct download link available.".to_string()
            }
            Error::Policy(PolicyRejection::FileTooLarge { size_mb, .. }) => format!(
                "File too big ({:.1} MB) — Telegram limit is ~2 GB.\n\
                 Try a smaller file or premium Telegram.",
                size_mb
            ),
            Error::DownloadFailed { status } => format!("Download failed (HTTP {})", status),
            Error::DeliveryFailed { reason } => format!("❌ Sending failed: {}", reason),
            Error::InvalidLink => INVALID_LINK_MESSAGE.to_string(),
            other => format!("Oops! Error: {}", other),
        }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Gateway(e) => match e {
                GatewayError::Status { .. } => "gateway_status",
                GatewayError::Parse { .. } => "gateway_parse",
                GatewayError::Unreachable { .. } => "gateway_unreachable",
            },
            Error::NoFileInfo => "no_file_info",
            Error::Policy(e) => match e {
                PolicyRejection::UnsupportedFolder { .. } => "unsupported_folder",
                PolicyRejection::NoDirectLink => "no_direct_link",
                PolicyRejection::FileTooLarge { .. } => "file_too_large",
            },
            Error::DownloadFailed { .. } => "download_failed",
            Error::DeliveryFailed { .. } => "delivery_failed",
            Error::InvalidLink => "invalid_link",
            Error::Messaging(_) => "messaging_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ShuttingDown => "shutting_down",
            Error::Other(_) => "internal_error",
        }
    }
}

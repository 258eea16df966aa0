//! Core types and events for sharelink-relay

use serde::{Deserialize, Serialize};

/// Unique identifier for a transfer session (process-local, never reused)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Get the inner value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A candidate share link
///
/// Validation is a substring heuristic only: any trimmed text that contains one
/// of the configured host markers (case-insensitive) is accepted and handed to
/// the resolver untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareLink(String);

impl ShareLink {
    /// Accept `text` if it contains one of `markers`, otherwise `None`
    ///
    /// # Examples
    ///
    /// ```
    /// use sharelink_relay::types::ShareLink;
    ///
    /// let markers = vec!["terabox".to_string()];
    /// assert!(ShareLink::recognize(" https://1024TeraBox.com/s/abc ", &markers).is_some());
    /// assert!(ShareLink::recognize("https://example.com/s/abc", &markers).is_none());
    /// ```
    pub fn recognize(text: &str, markers: &[String]) -> Option<Self> {
        let trimmed = text.trim();
        let lowered = trimmed.to_lowercase();
        markers
            .iter()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .any(|m| lowered.contains(&m))
            .then(|| Self(trimmed.to_string()))
    }

    /// The link text as received
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShareLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome flag of a resolution call
///
/// Any status string other than `"success"` (including a missing one) is a failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResolutionStatus {
    /// Gateway resolved the link
    Success,
    /// Gateway could not resolve the link
    #[default]
    Failure,
}

impl From<String> for ResolutionStatus {
    fn from(value: String) -> Self {
        if value == "success" {
            ResolutionStatus::Success
        } else {
            ResolutionStatus::Failure
        }
    }
}

impl From<ResolutionStatus> for String {
    fn from(value: ResolutionStatus) -> Self {
        match value {
            ResolutionStatus::Success => "success".to_string(),
            ResolutionStatus::Failure => "failure".to_string(),
        }
    }
}

/// One file described by the resolution gateway
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// File name, also used for the staging file and the outbound upload
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Size reported by the gateway
    #[serde(default)]
    pub size_bytes: u64,

    /// Direct download URL; the descriptor is unusable without it
    #[serde(default)]
    pub download_link: Option<String>,
}

impl FileDescriptor {
    /// Direct download link if present and non-blank
    pub fn direct_link(&self) -> Option<&str> {
        self.download_link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    /// Size in MiB as used by the size ceiling and captions
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / crate::config::BYTES_PER_MB
    }
}

fn default_filename() -> String {
    "video.mp4".to_string()
}

/// Body returned by the resolution gateway
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// Whether the gateway considers the resolution successful
    #[serde(default)]
    pub status: ResolutionStatus,

    /// Resolved files, in gateway order (may be empty)
    #[serde(default)]
    pub files: Vec<FileDescriptor>,
}

/// Transfer session state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, nothing attempted yet
    Idle,
    /// Calling the resolution gateway
    Resolving,
    /// Applying transfer policy to the resolution result
    Gating,
    /// Streaming the file into the staging area
    Downloading,
    /// Sending the staged file to the chat
    Dispatching,
    /// File delivered, status message removed
    Done,
    /// Terminal failure, status message shows the error
    Failed,
}

impl SessionState {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`
    ///
    /// Forward moves go one stage at a time; `Failed` is reachable from every
    /// non-terminal state; terminal states never move.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Idle, Resolving)
            | (Resolving, Gating)
            | (Gating, Downloading)
            | (Downloading, Dispatching)
            | (Dispatching, Done) => true,
            _ => false,
        }
    }

    /// Lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Resolving => "resolving",
            SessionState::Gating => "gating",
            SessionState::Downloading => "downloading",
            SessionState::Dispatching => "dispatching",
            SessionState::Done => "done",
            SessionState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a staged file is delivered to the chat
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Video message flagged for progressive playback
    StreamingMedia,
    /// Generic document attachment
    Document,
}

/// Reference to a message in a chat
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    /// Chat the message lives in
    pub chat_id: i64,
    /// Message ID within the chat
    pub message_id: i64,
}

/// A text message received by the front end
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Chat the message was sent in
    pub chat_id: i64,
    /// ID of the message, used as the reply target
    pub message_id: i64,
    /// Message text
    pub text: String,
}

impl InboundMessage {
    /// Reference to this message
    pub fn message_ref(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat_id,
            message_id: self.message_id,
        }
    }
}

/// Download progress snapshot published by the fetcher
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProgress {
    /// Bytes written to the staging file so far
    pub downloaded: u64,
    /// Expected total from `content-length`, if the origin sent one
    pub total: Option<u64>,
}

impl TransferProgress {
    /// Completed fraction in percent, when the total is known and non-zero
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => {
                Some((self.downloaded as f64 / total as f64 * 100.0).min(100.0))
            }
            _ => None,
        }
    }
}

/// Event emitted during a session's lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Session accepted a share link
    SessionStarted {
        /// Session ID
        id: SessionId,
        /// Chat the request came from
        chat_id: i64,
        /// The accepted link
        link: String,
    },

    /// Session moved to a new state
    StateChanged {
        /// Session ID
        id: SessionId,
        /// Previous state
        from: SessionState,
        /// New state
        to: SessionState,
    },

    /// Download progress update
    Downloading {
        /// Session ID
        id: SessionId,
        /// Bytes written so far
        downloaded: u64,
        /// Expected total, if known
        #[serde(skip_serializing_if = "Option::is_none")]
        total: Option<u64>,
    },

    /// File delivered to the chat
    Completed {
        /// Session ID
        id: SessionId,
        /// Delivered file name
        filename: String,
        /// Bytes delivered
        size_bytes: u64,
        /// Delivery mode used
        mode: DeliveryMode,
    },

    /// Session failed
    Failed {
        /// Session ID
        id: SessionId,
        /// State the session was in when it failed
        state: SessionState,
        /// Machine-readable error code
        code: String,
        /// Error message
        error: String,
    },

    /// Relay stopped accepting links
    Shutdown,
}

//! Route handlers for the HTTP service
//!
//! - `system`: health, usage help, event stream

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod system;

pub use system::*;

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` while links are accepted, `"shutting_down"` afterwards
    pub status: String,
    /// Crate version
    pub version: String,
    /// Sessions currently running
    pub active_sessions: usize,
    /// When the service started
    pub started_at: DateTime<Utc>,
}

/// Body of `GET /help`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpResponse {
    /// How to use the relay from a chat
    pub usage: String,
    /// Resolution gateway links are resolved through
    pub gateway: String,
    /// Largest file relayed, in MB
    pub max_file_size_mb: f64,
    /// Extensions delivered as playable video
    pub streaming_extensions: Vec<String>,
    /// Available HTTP endpoints
    pub endpoints: Vec<String>,
}

//! Application state for the HTTP service

use crate::{Config, Relay};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Relay the service reports on
    pub relay: Relay,

    /// Configuration (read-only)
    pub config: Arc<Config>,

    /// When the service was created
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create a new AppState, stamped with the current time
    pub fn new(relay: Relay, config: Arc<Config>) -> Self {
        Self {
            relay,
            config,
            started_at: Utc::now(),
        }
    }
}

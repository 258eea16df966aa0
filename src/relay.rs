//! Relay service: accepts share links and runs one session per request.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::messenger::Messenger;
use crate::session::{SessionContext, TransferSession};
use crate::types::{Event, InboundMessage, SessionId, ShareLink};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::broadcast;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

/// Reply to `/start`
pub const GREETING: &str = "Send any Terabox link (like https://1024terabox.com/s/xxxx).\n\
                            I'll download it and send the video/file right here!";

/// Capacity of the event bus; slow subscribers lag instead of blocking sessions
const EVENT_CAPACITY: usize = 1000;

/// Entry point for inbound requests
///
/// Cloning is cheap; all clones share the same sessions, counters and event bus.
#[derive(Clone)]
pub struct Relay {
    config: Arc<Config>,
    context: SessionContext,
    event_tx: broadcast::Sender<Event>,
    next_session_id: Arc<AtomicU64>,
    accepting_new: Arc<AtomicBool>,
    sessions: TaskTracker,
}

impl Relay {
    /// Build a relay that reports through `messenger`
    ///
    /// # Errors
    /// Returns a configuration error if `config` fails validation
    pub fn new(config: Config, messenger: Arc<dyn Messenger>) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        let context = SessionContext::new(&config, messenger, event_tx.clone())?;

        Ok(Self {
            config: Arc::new(config),
            context,
            event_tx,
            next_session_id: Arc::new(AtomicU64::new(1)),
            accepting_new: Arc::new(AtomicBool::new(true)),
            sessions: TaskTracker::new(),
        })
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Configuration the relay runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Answer a greeting command
    pub async fn greet(&self, chat_id: i64, reply_to: i64) -> Result<()> {
        self.context
            .messenger()
            .send_text(chat_id, Some(reply_to), GREETING)
            .await
    }

    /// Start a session for `message` if it looks like a share link
    ///
    /// Text that does not look like a share link gets the invalid-link reply
    /// and `Ok(None)`; no session is created for it. A started session runs in
    /// the background and reports through its own status message.
    ///
    /// # Errors
    /// - [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has begun
    /// - a messenger error if the invalid-link reply cannot be sent
    pub async fn handle_link(&self, message: InboundMessage) -> Result<Option<SessionId>> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let Some(link) = ShareLink::recognize(&message.text, &self.config.links.host_markers)
        else {
            let rejection = Error::InvalidLink;
            debug!(
                chat_id = message.chat_id,
                error_code = rejection.error_code(),
                "ignoring text that is not a share link"
            );
            self.context
                .messenger()
                .send_text(
                    message.chat_id,
                    Some(message.message_id),
                    &rejection.user_message(),
                )
                .await?;
            return Ok(None);
        };

        let id = SessionId(self.next_session_id.fetch_add(1, Ordering::SeqCst));
        let session = TransferSession::new(id, message, link, self.context.clone());
        self.sessions.spawn(session.run());
        Ok(Some(id))
    }

    /// Number of sessions still running
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Whether new links are still accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Stop accepting links and wait for every running session to finish
    ///
    /// In-flight transfers are not interrupted.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown");
        self.accepting_new.store(false, Ordering::SeqCst);

        let active = self.sessions.len();
        if active > 0 {
            info!(active_sessions = active, "Waiting for running sessions to finish");
        }
        self.sessions.close();
        self.sessions.wait().await;

        let _ = self.event_tx.send(Event::Shutdown);
        info!("Graceful shutdown complete");
    }
}

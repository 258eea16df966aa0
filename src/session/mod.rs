//! One share link's trip from resolution to delivery
//!
//! A [`TransferSession`] runs its stages as sequential awaits inside a single
//! task and owns both per-session resources: the status message and the
//! staging file. Every exit path goes through the same cleanup code in
//! [`TransferSession::run`].

mod status;


pub use status::{RESOLVING_TEXT, SENDING_TEXT, downloading_text, progress_text};

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{Error, PolicyRejection, Result};
use crate::fetcher::{StreamingFetcher, TransferOutcome};
use crate::gate::TransferGate;
use crate::messenger::Messenger;
use crate::resolver::MetadataResolver;
use crate::staging::StagingFile;
use crate::types::{
    DeliveryMode, Event, InboundMessage, SessionId, SessionState, ShareLink, TransferProgress,
};
use status::{StatusHandle, report_progress};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// Collaborators shared by every session
///
/// Everything here is either immutable or internally pooled, so cloning the
/// context per session is cheap and needs no locking.
#[derive(Clone)]
pub struct SessionContext {
    resolver: MetadataResolver,
    gate: TransferGate,
    fetcher: StreamingFetcher,
    dispatcher: Dispatcher,
    messenger: Arc<dyn Messenger>,
    staging_root: PathBuf,
    progress_interval: Duration,
    event_tx: broadcast::Sender<Event>,
}

impl SessionContext {
    /// Build the shared pipeline components from `config`
    pub fn new(
        config: &Config,
        messenger: Arc<dyn Messenger>,
        event_tx: broadcast::Sender<Event>,
    ) -> Result<Self> {
        Ok(Self {
            resolver: MetadataResolver::new(&config.resolver)?,
            gate: TransferGate::new(config.transfer.max_file_size_mb),
            fetcher: StreamingFetcher::new(&config.transfer)?,
            dispatcher: Dispatcher::new(messenger.clone(), config.transfer.source_label.clone()),
            messenger,
            staging_root: config.transfer.staging_dir.clone(),
            progress_interval: config.transfer.progress_interval,
            event_tx,
        })
    }

    /// Messenger sessions report through
    pub fn messenger(&self) -> &Arc<dyn Messenger> {
        &self.messenger
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}

/// How a session ended
#[derive(Clone, Debug, PartialEq)]
pub enum SessionOutcome {
    /// The file reached the chat
    Delivered {
        /// Name from the resolved descriptor
        filename: String,
        /// Bytes staged and uploaded
        size_bytes: u64,
        /// Delivery mode used
        mode: DeliveryMode,
    },
    /// The session stopped with an error shown in the status message
    Failed {
        /// State the failure happened in
        state: SessionState,
        /// Machine-readable error code
        code: &'static str,
        /// Text written into the status message
        message: String,
    },
}

struct Delivery {
    filename: String,
    size_bytes: u64,
    mode: DeliveryMode,
}

/// State machine for one request
pub struct TransferSession {
    id: SessionId,
    request: InboundMessage,
    link: ShareLink,
    state: SessionState,
    ctx: SessionContext,
}

impl TransferSession {
    /// Create an idle session for `link`, received in `request`
    pub fn new(
        id: SessionId,
        request: InboundMessage,
        link: ShareLink,
        ctx: SessionContext,
    ) -> Self {
        Self {
            id,
            request,
            link,
            state: SessionState::Idle,
            ctx,
        }
    }

    /// Session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session to `Done` or `Failed`
    ///
    /// The staging file is released before the terminal state is entered,
    /// whichever stage the session stopped in.
    pub async fn run(mut self) -> SessionOutcome {
        info!(
            session_id = self.id.0,
            chat_id = self.request.chat_id,
            link = %self.link,
            "session started"
        );
        self.ctx.emit(Event::SessionStarted {
            id: self.id,
            chat_id: self.request.chat_id,
            link: self.link.to_string(),
        });

        let mut status = None;
        let mut staging = None;
        let result = self.execute(&mut status, &mut staging).await;

        if let Some(mut staged) = staging.take()
            && let Err(e) = staged.release().await
        {
            warn!(
                session_id = self.id.0,
                path = ?staged.path(),
                error = %e,
                "failed to release staging file"
            );
        }

        let result = match result {
            Ok(delivery) => self.advance(SessionState::Done).map(|()| delivery),
            Err(e) => Err(e),
        };

        match result {
            Ok(delivery) => self.complete(status, delivery).await,
            Err(e) => self.fail(status, e).await,
        }
    }

    async fn execute(
        &mut self,
        status_slot: &mut Option<StatusHandle>,
        staging_slot: &mut Option<StagingFile>,
    ) -> Result<Delivery> {
        self.advance(SessionState::Resolving)?;
        let status = status_slot.insert(
            StatusHandle::open(
                self.ctx.messenger.clone(),
                self.request.message_ref(),
                RESOLVING_TEXT,
            )
            .await?,
        );
        let resolution = self.ctx.resolver.resolve(&self.link).await?;

        self.advance(SessionState::Gating)?;
        let descriptor = self.ctx.gate.check(resolution)?;
        let url = descriptor
            .direct_link()
            .ok_or(PolicyRejection::NoDirectLink)?
            .to_string();

        self.advance(SessionState::Downloading)?;
        let header = downloading_text(&descriptor.filename, descriptor.size_bytes);
        status.set_or_warn(&header, self.id).await;
        let staging = staging_slot.insert(
            StagingFile::create(&self.ctx.staging_root, self.id, &descriptor.filename).await?,
        );
        let outcome = self.download(&url, staging, status, &header).await?;
        debug!(
            session_id = self.id.0,
            bytes = outcome.bytes_written,
            expected = ?outcome.expected,
            "file staged"
        );

        self.advance(SessionState::Dispatching)?;
        status.set_or_warn(SENDING_TEXT, self.id).await;
        let mode = self
            .ctx
            .dispatcher
            .dispatch(
                staging,
                &descriptor.filename,
                descriptor.size_bytes,
                self.request.message_ref(),
            )
            .await?;

        Ok(Delivery {
            filename: descriptor.filename,
            size_bytes: outcome.bytes_written,
            mode,
        })
    }

    /// Run the fetch and the progress reporter side by side
    async fn download(
        &self,
        url: &str,
        staging: &mut StagingFile,
        status: &mut StatusHandle,
        header: &str,
    ) -> Result<TransferOutcome> {
        let (progress_tx, progress_rx) = watch::channel(TransferProgress::default());

        let transfer = async move {
            let result = self.ctx.fetcher.fetch(url, staging, &progress_tx).await;
            // Closing the channel ends the reporter
            drop(progress_tx);
            result
        };
        let reporter = report_progress(
            status,
            progress_rx,
            header,
            self.ctx.progress_interval,
            self.id,
            &self.ctx.event_tx,
        );

        let (result, ()) = tokio::join!(transfer, reporter);
        result
    }

    fn advance(&mut self, next: SessionState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::Other(format!(
                "illegal session transition {} -> {}",
                self.state, next
            )));
        }
        let from = std::mem::replace(&mut self.state, next);
        debug!(session_id = self.id.0, from = %from, to = %next, "session state changed");
        self.ctx.emit(Event::StateChanged {
            id: self.id,
            from,
            to: next,
        });
        Ok(())
    }

    async fn complete(self, status: Option<StatusHandle>, delivery: Delivery) -> SessionOutcome {
        if let Some(status) = status
            && let Err(e) = status.delete().await
        {
            warn!(session_id = self.id.0, error = %e, "failed to delete status message");
        }

        info!(
            session_id = self.id.0,
            chat_id = self.request.chat_id,
            filename = %delivery.filename,
            bytes = delivery.size_bytes,
            mode = ?delivery.mode,
            "session completed"
        );
        self.ctx.emit(Event::Completed {
            id: self.id,
            filename: delivery.filename.clone(),
            size_bytes: delivery.size_bytes,
            mode: delivery.mode,
        });

        SessionOutcome::Delivered {
            filename: delivery.filename,
            size_bytes: delivery.size_bytes,
            mode: delivery.mode,
        }
    }

    async fn fail(mut self, status: Option<StatusHandle>, error: Error) -> SessionOutcome {
        let failed_in = self.state;
        if let Err(e) = self.advance(SessionState::Failed) {
            warn!(session_id = self.id.0, error = %e, "session already terminal");
        }

        let message = error.user_message();
        warn!(
            session_id = self.id.0,
            chat_id = self.request.chat_id,
            state = %failed_in,
            error_code = error.error_code(),
            error = %error,
            "session failed"
        );

        match status {
            Some(mut status) => status.set_or_warn(&message, self.id).await,
            None => warn!(
                session_id = self.id.0,
                "no status message to report the failure in"
            ),
        }

        self.ctx.emit(Event::Failed {
            id: self.id,
            state: failed_in,
            code: error.error_code().to_string(),
            error: error.to_string(),
        });

        SessionOutcome::Failed {
            state: failed_in,
            code: error.error_code(),
            message,
        }
    }
}

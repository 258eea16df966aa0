//! Long-polling front end: turns Telegram updates into relay calls.

use crate::error::{Error, Result};
use crate::messenger::TelegramMessenger;
use crate::relay::Relay;
use crate::types::InboundMessage;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pause before polling again after a failed `getUpdates`
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// What an inbound text asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `/start`, optionally addressed as `/start@botname`
    Start,
    /// Any other slash command; ignored
    Unknown,
    /// Plain text, treated as a candidate share link
    Link,
}

impl Command {
    /// Classify a message text
    ///
    /// # Examples
    ///
    /// ```
    /// use sharelink_relay::bot::Command;
    ///
    /// assert_eq!(Command::parse("/start"), Command::Start);
    /// assert_eq!(Command::parse("/start@relay_bot now"), Command::Start);
    /// assert_eq!(Command::parse("/help"), Command::Unknown);
    /// assert_eq!(Command::parse("https://terabox.com/s/x"), Command::Link);
    /// ```
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim_start();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Command::Link;
        };

        let word = rest.split_whitespace().next().unwrap_or_default();
        let name = word.split('@').next().unwrap_or_default();
        if name.eq_ignore_ascii_case("start") {
            Command::Start
        } else {
            Command::Unknown
        }
    }
}

/// Route one inbound message to the relay
pub async fn route(relay: &Relay, message: InboundMessage) -> Result<()> {
    match Command::parse(&message.text) {
        Command::Start => {
            debug!(chat_id = message.chat_id, "greeting");
            relay.greet(message.chat_id, message.message_id).await
        }
        Command::Unknown => {
            debug!(chat_id = message.chat_id, "ignoring unknown command");
            Ok(())
        }
        Command::Link => {
            if let Some(id) = relay.handle_link(message).await? {
                debug!(session_id = id.0, "session queued");
            }
            Ok(())
        }
    }
}

/// Poll for updates until `cancel` fires
///
/// Updates queued before start are skipped when the configuration asks for
/// it. Polling errors are logged and retried after a short pause; routing
/// errors only affect the message they came from.
pub async fn run_polling(
    relay: Relay,
    telegram: TelegramMessenger,
    cancel: CancellationToken,
) -> Result<()> {
    let poll_timeout = relay.config().telegram.poll_timeout;
    let mut offset = None;

    if relay.config().telegram.drop_pending_updates {
        match telegram.pending_offset().await {
            Ok(skip_to) => {
                if skip_to.is_some() {
                    info!("Dropped pending updates");
                }
                offset = skip_to;
            }
            Err(e) => warn!(error = %e, "Could not drop pending updates"),
        }
    }

    info!("Polling for updates");

    loop {
        let polled = tokio::select! {
            _ = cancel.cancelled() => break,
            polled = telegram.get_updates(offset, poll_timeout) => polled,
        };

        let updates = match polled {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "getUpdates failed, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(RETRY_DELAY) => {}
                }
                continue;
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            let Some(message) = update.into_inbound() else {
                continue;
            };
            let chat_id = message.chat_id;
            match route(&relay, message).await {
                Ok(()) => {}
                Err(Error::ShuttingDown) => {
                    debug!(chat_id, "link refused during shutdown");
                }
                Err(e) => {
                    error!(
                        chat_id,
                        error = %e,
                        error_code = e.error_code(),
                        "failed to handle message"
                    );
                }
            }
        }
    }

    info!("Polling stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::INVALID_LINK_MESSAGE;
    use crate::relay::GREETING;
    use crate::test_helpers::RecordingMessenger;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn inbound(text: &str) -> InboundMessage {
        InboundMessage {
            chat_id: 5,
            message_id: 9,
            text: text.to_string(),
        }
    }

    #[test]
    fn parse_start_variants() {
        assert_eq!(Command::parse("/start"), Command::Start);
        assert_eq!(Command::parse("  /START"), Command::Start);
        assert_eq!(Command::parse("/start@SomeBot"), Command::Start);
        assert_eq!(Command::parse("/start payload"), Command::Start);
        assert_eq!(Command::parse("/started"), Command::Unknown);
        assert_eq!(Command::parse("/"), Command::Unknown);
        assert_eq!(Command::parse("hello"), Command::Link);
    }

    fn relay(messenger: Arc<RecordingMessenger>) -> Relay {
        Relay::new(Config::default(), messenger).unwrap()
    }

    #[tokio::test]
    async fn start_is_greeted() {
        let messenger = Arc::new(RecordingMessenger::new());
        route(&relay(messenger.clone()), inbound("/start")).await.unwrap();
        assert_eq!(messenger.texts(), vec![GREETING.to_string()]);
    }

    #[tokio::test]
    async fn unknown_command_is_ignored() {
        let messenger = Arc::new(RecordingMessenger::new());
        route(&relay(messenger.clone()), inbound("/help")).await.unwrap();
        assert!(messenger.calls().is_empty());
    }

    #[tokio::test]
    async fn plain_text_goes_to_relay() {
        let messenger = Arc::new(RecordingMessenger::new());
        route(&relay(messenger.clone()), inbound("not a link")).await.unwrap();
        assert_eq!(messenger.texts(), vec![INVALID_LINK_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn polling_routes_updates_and_stops_on_cancel() {
        let server = MockServer::start().await;
        let token = "1:abc";

        Mock::given(method("POST"))
            .and(path(format!("/bot{}/getUpdates", token)))
            .and(body_partial_json(json!({"offset": 11})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true, "result": []}))
                    .set_delay(Duration::from_millis(50)),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{}/getUpdates", token)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [{
                    "update_id": 10,
                    "message": {"message_id": 3, "chat": {"id": 77}, "text": "/start"}
                }]
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{}/sendMessage", token)))
            .and(body_partial_json(json!({"chat_id": 77, "reply_to_message_id": 3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"message_id": 4, "chat": {"id": 77}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.telegram.token = Some(token.to_string());
        config.telegram.api_base = server.uri();
        config.telegram.poll_timeout = Duration::ZERO;
        config.telegram.drop_pending_updates = false;

        let telegram = TelegramMessenger::new(&config.telegram).unwrap();
        let relay = Relay::new(config, Arc::new(telegram.clone())).unwrap();
        let cancel = CancellationToken::new();

        let poller = tokio::spawn(run_polling(relay, telegram, cancel.clone()));
        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();

        poller.await.unwrap().unwrap();
    }
}

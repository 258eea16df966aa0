//! Share link resolution through the external gateway.

use crate::config::ResolverConfig;
use crate::error::{Error, GatewayError, Result};
use crate::types::{ResolutionResult, ShareLink};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Calls the resolution gateway and decodes its file list
///
/// One [`resolve`](Self::resolve) call issues exactly one GET; nothing is retried.
#[derive(Clone, Debug)]
pub struct MetadataResolver {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl MetadataResolver {
    /// Create a resolver for the configured gateway
    ///
    /// # Errors
    /// Returns a configuration error if the base URL does not parse, or an
    /// I/O error if the HTTP client cannot be built
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            Error::config(
                format!("invalid resolver URL '{}': {}", config.base_url, e),
                "GATEWAY_URL",
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                Error::Io(std::io::Error::other(format!(
                    "Failed to create HTTP client: {}",
                    e
                )))
            })?;

        Ok(Self {
            client,
            base_url,
            timeout: config.timeout,
        })
    }

    /// Gateway URL for `link`, with the link escaped into the `url` query parameter
    pub fn endpoint_for(&self, link: &ShareLink) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("url", link.as_str());
        url
    }

    /// Resolve `link` into the gateway's file list
    ///
    /// A `failure` status or an empty file list is returned as-is; callers decide
    /// how to treat it.
    ///
    /// # Errors
    /// - [`GatewayError::Unreachable`] when the request fails or times out
    /// - [`GatewayError::Status`] for a non-2xx answer
    /// - [`GatewayError::Parse`] when the body is not the expected JSON
    pub async fn resolve(&self, link: &ShareLink) -> Result<ResolutionResult> {
        let url = self.endpoint_for(link);
        debug!(link = %link, "resolving share link");

        let response = self.client.get(url).send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                format!("no answer within {} seconds", self.timeout.as_secs())
            } else if e.is_connect() {
                format!("connection failed: {}", e)
            } else {
                e.to_string()
            };
            Error::Gateway(GatewayError::Unreachable { reason })
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Gateway(GatewayError::Status {
                status: status.as_u16(),
            }));
        }

        let body = response.bytes().await.map_err(|e| {
            Error::Gateway(GatewayError::Unreachable {
                reason: format!("failed to read gateway response: {}", e),
            })
        })?;

        let result: ResolutionResult = serde_json::from_slice(&body).map_err(|e| {
            Error::Gateway(GatewayError::Parse {
                reason: e.to_string(),
            })
        })?;

        debug!(
            link = %link,
            status = ?result.status,
            files = result.files.len(),
            "share link resolved"
        );
        Ok(result)
    }
}

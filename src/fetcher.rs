//! Streaming download from the origin into a staging file.

use crate::config::TransferConfig;
use crate::error::{Error, Result};
use crate::staging::StagingFile;
use crate::types::TransferProgress;
use futures::TryStreamExt;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio_util::io::StreamReader;
use tracing::debug;

/// Result of a completed transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Bytes written to the staging file
    pub bytes_written: u64,
    /// `content-length` announced by the origin, if any
    pub expected: Option<u64>,
}

/// Downloads a direct link in fixed-size chunks
///
/// Only connecting is time-limited; a large transfer may take as long as it
/// needs once bytes are flowing. Memory use is one chunk buffer per transfer.
#[derive(Clone, Debug)]
pub struct StreamingFetcher {
    client: reqwest::Client,
    chunk_size: usize,
}

impl StreamingFetcher {
    /// Create a fetcher using the transfer settings
    pub fn new(config: &TransferConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| {
                Error::Io(std::io::Error::other(format!(
                    "Failed to create HTTP client: {}",
                    e
                )))
            })?;

        Ok(Self {
            client,
            chunk_size: config.chunk_size.max(1),
        })
    }

    /// Stream `url` into `staging`, publishing progress after every chunk
    ///
    /// Progress goes through a watch channel so a slow observer never holds up
    /// the transfer; it only ever sees the latest snapshot. The staging file is
    /// flushed and closed before returning.
    ///
    /// # Errors
    /// - [`Error::DownloadFailed`] when the origin answers with a non-2xx status
    /// - [`Error::Network`] when the request cannot be sent
    /// - [`Error::Io`] when reading the body or writing the staging file fails
    pub async fn fetch(
        &self,
        url: &str,
        staging: &mut StagingFile,
        progress: &watch::Sender<TransferProgress>,
    ) -> Result<TransferOutcome> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::DownloadFailed {
                status: status.as_u16(),
            });
        }

        let expected = response.content_length();
        progress.send_replace(TransferProgress {
            downloaded: 0,
            total: expected,
        });

        let stream = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        let mut reader = StreamReader::new(stream);
        let mut buffer = vec![0u8; self.chunk_size];
        let mut downloaded = 0u64;

        loop {
            let filled = fill_chunk(&mut reader, &mut buffer).await?;
            if filled == 0 {
                break;
            }
            staging.write_chunk(&buffer[..filled]).await?;
            downloaded += filled as u64;
            progress.send_replace(TransferProgress {
                downloaded,
                total: expected,
            });
        }

        let bytes_written = staging.finish().await?;
        debug!(
            bytes = bytes_written,
            expected = ?expected,
            "transfer finished"
        );

        Ok(TransferOutcome {
            bytes_written,
            expected,
        })
    }
}

/// Read until `buffer` is full or the body ends; returns the bytes read
async fn fill_chunk<R>(reader: &mut R, buffer: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buffer.len() {
        let n = reader.read(&mut buffer[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

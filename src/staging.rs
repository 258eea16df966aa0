//! Transient per-session storage for downloaded bytes
//!
//! A [`StagingFile`] lives in its own uniquely named `session-<id>-<random>`
//! directory under the configured staging root. Session ids restart with every
//! relay, so the random suffix is what keeps two relays sharing a root (or a
//! restart finding a crashed run's leftovers) out of each other's files. The
//! owning session calls [`StagingFile::release`] on its single cleanup path;
//! dropping the directory guard removes whatever is left if a session is torn
//! down without reaching it.

use crate::error::{Error, Result};
use crate::types::SessionId;
use crate::utils::sanitize_filename;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Exclusively owned transient byte store for one session
#[derive(Debug)]
pub struct StagingFile {
    path: PathBuf,
    filename: String,
    // Declared before `dir`: the handle closes before the directory is removed
    file: Option<File>,
    dir: Option<TempDir>,
    written: u64,
    released: bool,
}

impl StagingFile {
    /// Create an empty staging file for `filename` under `root`
    pub async fn create(root: &Path, session: SessionId, filename: &str) -> Result<Self> {
        fs::create_dir_all(root).await?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("session-{}-", session))
            .tempdir_in(root)?;

        let filename = sanitize_filename(filename);
        let path = dir.path().join(&filename);
        let file = File::create(&path).await?;

        debug!(session_id = session.0, path = ?path, "staging file created");

        Ok(Self {
            path,
            filename,
            file: Some(file),
            dir: Some(dir),
            written: 0,
            released: false,
        })
    }

    /// Append a chunk; chunks land in call order
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let file = self.file.as_mut().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                ErrorKind::BrokenPipe,
                "staging file is closed for writing",
            ))
        })?;
        file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Flush and close the write handle, returning the number of bytes staged
    ///
    /// Calling this again after the handle is closed is a no-op.
    pub async fn finish(&mut self) -> Result<u64> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(self.written)
    }

    /// Delete the staged bytes and the session directory
    ///
    /// Idempotent: later calls find nothing to remove and succeed.
    pub async fn release(&mut self) -> Result<()> {
        self.file.take();

        if self.released {
            return Ok(());
        }

        match fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        if let Some(dir) = self.dir.take() {
            let dir_path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(dir = ?dir_path, error = %e, "could not remove staging directory");
            }
        }

        self.released = true;
        debug!(path = ?self.path, "staging file released");
        Ok(())
    }

    /// Where the bytes are stored
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sanitized file name used on disk and for the upload
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Bytes written so far
    pub fn len(&self) -> u64 {
        self.written
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Whether [`release`](Self::release) already ran
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.file.take();
        // TempDir removes the directory and anything still in it
        if let Some(dir) = self.dir.take() {
            let dir_path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(dir = ?dir_path, error = %e, "failed to remove staging directory on drop");
            }
        }
    }
}

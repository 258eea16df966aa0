//! Transfer policy applied to a resolution result before any bytes move.

use crate::error::{Error, PolicyRejection, Result};
use crate::types::{FileDescriptor, ResolutionResult, ResolutionStatus};

/// Policy checks between resolution and download
///
/// Checks run in a fixed order and the first failing one wins:
/// 1. a failed resolution or an empty file list is [`Error::NoFileInfo`]
/// 2. more than one file is [`PolicyRejection::UnsupportedFolder`]
/// 3. a missing direct link is [`PolicyRejection::NoDirectLink`]
/// 4. a size above the ceiling is [`PolicyRejection::FileTooLarge`]
#[derive(Clone, Copy, Debug)]
pub struct TransferGate {
    max_file_size_mb: f64,
}

impl TransferGate {
    /// Create a gate with the given size ceiling in MiB
    pub fn new(max_file_size_mb: f64) -> Self {
        Self { max_file_size_mb }
    }

    /// Configured ceiling in MiB
    pub fn max_file_size_mb(&self) -> f64 {
        self.max_file_size_mb
    }

    /// Select the single acceptable descriptor from `result`
    pub fn check(&self, result: ResolutionResult) -> Result<FileDescriptor> {
        if result.status != ResolutionStatus::Success || result.files.is_empty() {
            return Err(Error::NoFileInfo);
        }

        if result.files.len() > 1 {
            return Err(PolicyRejection::UnsupportedFolder {
                count: result.files.len(),
            }
            .into());
        }

        let Some(descriptor) = result.files.into_iter().next() else {
            return Err(Error::NoFileInfo);
        };

        if descriptor.direct_link().is_none() {
            return Err(PolicyRejection::NoDirectLink.into());
        }

        let size_mb = descriptor.size_mb();
        if size_mb > self.max_file_size_mb {
            return Err(PolicyRejection::FileTooLarge {
                size_mb,
                ceiling_mb: self.max_file_size_mb,
            }
            .into());
        }

        Ok(descriptor)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn file(name: &str, size_bytes: u64, link: Option<&str>) -> FileDescriptor {
        FileDescriptor {
            filename: name.to_string(),
            size_bytes,
            download_link: link.map(str::to_string),
        }
    }

    fn success(files: Vec<FileDescriptor>) -> ResolutionResult {
        ResolutionResult {
            status: ResolutionStatus::Success,
            files,
        }
    }

    #[test]
    fn accepts_single_file_under_ceiling() {
        let gate = TransferGate::new(1800.0);
        let descriptor = gate
            .check(success(vec![file("clip.mp4", 50 * MB, Some("http://origin/x"))]))
            .unwrap();

        assert_eq!(descriptor.filename, "clip.mp4");
    }

    #[test]
    fn empty_file_list_is_no_file_info() {
        let gate = TransferGate::new(1800.0);
        assert!(matches!(gate.check(success(vec![])), Err(Error::NoFileInfo)));
    }

    #[test]
    fn failed_status_is_no_file_info_even_with_files() {
        let gate = TransferGate::new(1800.0);
        let result = ResolutionResult {
            status: ResolutionStatus::Failure,
            files: vec![file("clip.mp4", MB, Some("http://origin/x"))],
        };
        assert!(matches!(gate.check(result), Err(Error::NoFileInfo)));
    }

    #[test]
    fn multiple_files_are_rejected_as_folder() {
        let gate = TransferGate::new(1800.0);
        let err = gate
            .check(success(vec![
                file("a.mp4", MB, Some("http://origin/a")),
                file("b.mp4", MB, Some("http://origin/b")),
            ]))
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Policy(PolicyRejection::UnsupportedFolder { count: 2 })
        ));
    }

    #[test]
    fn folder_check_runs_before_link_and_size_checks() {
        let gate = TransferGate::new(1.0);
        let err = gate
            .check(success(vec![
                file("a.mp4", 5000 * MB, None),
                file("b.mp4", 5000 * MB, None),
            ]))
            .unwrap_err();

        assert_eq!(err.error_code(), "unsupported_folder");
    }

    #[test]
    fn missing_link_is_rejected_before_size() {
        let gate = TransferGate::new(1.0);
        let err = gate
            .check(success(vec![file("big.mkv", 5000 * MB, None)]))
            .unwrap_err();

        assert!(matches!(err, Error::Policy(PolicyRejection::NoDirectLink)));
    }

    #[test]
    fn oversize_file_reports_size() {
        let gate = TransferGate::new(1800.0);
        let err = gate
            .check(success(vec![file("big.mkv", 1900 * MB, Some("http://origin/x"))]))
            .unwrap_err();

        match &err {
            Error::Policy(PolicyRejection::FileTooLarge {
                size_mb,
                ceiling_mb,
            }) => {
                assert_eq!(format!("{size_mb:.1}"), "1900.0");
                assert_eq!(*ceiling_mb, 1800.0);
            }
            other => panic!("expected FileTooLarge, got {other:?}"),
        }
        assert!(err.user_message().contains("1900.0 MB"));
    }

    #[test]
    fn size_exactly_at_ceiling_passes() {
        let gate = TransferGate::new(1800.0);
        assert!(
            gate.check(success(vec![file("edge.bin", 1800 * MB, Some("http://o/x"))]))
                .is_ok()
        );
        assert!(
            gate.check(success(vec![file("edge.bin", 1800 * MB + 1, Some("http://o/x"))]))
                .is_err()
        );
    }
}

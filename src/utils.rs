//! Utility functions for size formatting and file names

use crate::config::BYTES_PER_MB;
use std::path::Path;

/// Fallback used when a file name sanitizes down to nothing
const FALLBACK_FILENAME: &str = "download";

/// Format a byte count as MiB with one decimal place
///
/// # Examples
///
/// ```
/// use sharelink_relay::utils::format_mb;
///
/// assert_eq!(format_mb(52_428_800), "50.0");
/// assert_eq!(format_mb(0), "0.0");
/// ```
#[must_use]
pub fn format_mb(bytes: u64) -> String {
    format!("{:.1}", bytes as f64 / BYTES_PER_MB)
}

/// Human-readable byte count for progress lines where no total is known
///
/// # Examples
///
/// ```
/// use sharelink_relay::utils::format_bytes;
///
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(1536), "1.5 KB");
/// assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
/// ```
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Reduce a gateway-supplied file name to a single safe path component
///
/// Directory parts are dropped, path separators and control characters are
/// replaced with `_`, and leading dots are stripped so the result can never
/// escape the staging directory or become a hidden file.
///
/// # Examples
///
/// ```
/// use sharelink_relay::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("clip.mp4"), "clip.mp4");
/// assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
/// assert_eq!(sanitize_filename(".."), "download");
/// ```
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let last = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = last
        .chars()
        .map(|c| if c.is_control() || c == ':' { '_' } else { c })
        .collect();

    let cleaned = cleaned.trim().trim_start_matches('.').trim();
    if cleaned.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Lowercased extension of `filename`, without the dot
#[must_use]
pub fn extension_lowercase(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

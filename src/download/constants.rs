//! Constants for the download module (timeouts, retry budget, cache limits).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Maximum redirects followed by the shared HTTP client.
pub const MAX_REDIRECTS: usize = 10;

/// Total download attempts per accepted `start()`, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Fixed pause between a failed attempt and the next one.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(2000);

/// Entries kept by [`CacheStrategy::MaximizeCache`](super::CacheStrategy::MaximizeCache).
pub const DEFAULT_MAX_CACHED: usize = 5;

/// `Content-Type` values accepted for a document response (case-insensitive substring).
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &["application/pdf", "application/octet-stream"];

/// Bytes inspected at each end of a file by the PDF validator.
pub(crate) const PDF_PROBE_LEN: u64 = 1024;

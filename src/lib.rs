//! PDF Fetch Library
//!
//! Fetches remote documents into a local cache with at most one download per
//! URL in flight, bounded retry of transient failures, validation by both
//! response metadata and file content, and atomic publishing of the result.
//!
//! # Architecture
//!
//! - [`download`] - coordinator, transport, cache, validation, registry and retry policy
//!
//! Host applications build one [`DownloadEngine`] per process and create a
//! [`DownloadCoordinator`](download::DownloadCoordinator) per request.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use download::{
    ActiveDownloads, CacheResolver, CacheStrategy, ContentValidator, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_CACHED, DEFAULT_RETRY_DELAY, DirectoryCache, DownloadEngine, DownloadError,
    DownloadObserver, DownloadRequest, DownloadTask, EngineError, ErrorKind, HttpClient,
    PdfValidator, RetryPolicy, Transport,
};

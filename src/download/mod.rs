//! Single-flight, retrying, validating document downloads.
//!
//! This module fetches a remote document into an on-disk cache, making sure
//! that at most one download per URL is in flight, that the result is
//! checked both by response metadata and by content inspection, and that
//! consumers never observe a partially written file.
//!
//! # Features
//!
//! - Deduplication of concurrent downloads through a shared [`ActiveDownloads`] registry
//! - Cache reuse and eviction driven by [`CacheStrategy`]
//! - Bounded fixed-delay retry of transient failures ([`RetryPolicy`])
//! - `Content-Type` and structural validation ([`ContentValidator`], [`PdfValidator`])
//! - Temp-file-then-rename publishing
//! - Lifecycle callbacks on a designated runtime ([`DownloadObserver`])
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use pdf_fetch::download::{
//!     ActiveDownloads, CacheStrategy, DirectoryCache, DownloadEngine, DownloadError,
//!     DownloadObserver, DownloadRequest, HttpClient, PdfValidator,
//! };
//!
//! struct Log;
//!
//! impl DownloadObserver for Log {
//!     fn on_download_progress(&mut self, done: u64, total: Option<u64>) {
//!         println!("{done}/{total:?}");
//!     }
//!     fn on_download_success(&mut self, path: PathBuf) {
//!         println!("saved {}", path.display());
//!     }
//!     fn on_download_error(&mut self, error: DownloadError) {
//!         eprintln!("{error}");
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(ActiveDownloads::new());
//! let engine = DownloadEngine::new(
//!     Arc::new(HttpClient::new()),
//!     Arc::new(DirectoryCache::new("./cache")),
//!     Arc::new(PdfValidator),
//! )?
//! .with_registry(registry);
//!
//! let request = DownloadRequest::new("https://example.com/paper.pdf")
//!     .with_header("Authorization", "Bearer token")
//!     .with_cache_strategy(CacheStrategy::MaximizeCache);
//! if let Some(task) = engine.coordinator(request, Log).start() {
//!     task.wait().await;
//! }
//! # Ok(())
//! # }
//! ```

mod cache;
mod client;
pub mod constants;
mod engine;
mod error;
mod observer;
mod registry;
mod retry;
mod validator;
mod writer;

pub use cache::{CacheResolver, CacheStrategy, DirectoryCache, cache_key};
pub use client::{BodyStream, HttpClient, Transport, TransportResponse};
pub use constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_CACHED, DEFAULT_RETRY_DELAY};
pub use engine::{DownloadCoordinator, DownloadEngine, DownloadRequest, DownloadTask, EngineError};
pub use error::{BoxError, DownloadError, ErrorKind};
pub use observer::DownloadObserver;
pub use registry::{ActiveDownloadGuard, ActiveDownloads};
pub use retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
pub use validator::{ContentValidator, PdfValidator};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.

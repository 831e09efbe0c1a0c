//! Single-flight download coordination with retry, validation and atomic publish.
//!
//! [`DownloadEngine`] bundles the services shared by every download (transport,
//! cache, content validator, active-download registry, retry policy and the
//! two runtimes). A [`DownloadCoordinator`] binds one [`DownloadRequest`] and
//! one observer to an engine; [`DownloadCoordinator::start`] hands the work to
//! the I/O runtime and returns immediately.
//!
//! # Pipeline
//!
//! 1. Scheme check - only `http://` and `https://` (any case) are accepted
//! 2. Cache check - purge stale entries, then serve a valid cached file without touching the network
//! 3. Retry loop - up to `max_attempts` attempts with a fixed pause; content errors end it early
//! 4. Attempt - temp file next to the artifact, GET, status and `Content-Type`
//!    checks, stream to the temp file, rename onto the artifact, re-validate
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use pdf_fetch::download::{
//!     DirectoryCache, DownloadEngine, DownloadError, DownloadObserver, DownloadRequest,
//!     HttpClient, PdfValidator,
//! };
//!
//! struct Print;
//!
//! impl DownloadObserver for Print {
//!     fn on_download_success(&mut self, path: PathBuf) {
//!         println!("ready: {}", path.display());
//!     }
//!     fn on_download_error(&mut self, error: DownloadError) {
//!         eprintln!("failed: {error}");
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = DownloadEngine::new(
//!     Arc::new(HttpClient::new()),
//!     Arc::new(DirectoryCache::new("./cache")),
//!     Arc::new(PdfValidator),
//! )?;
//! let request = DownloadRequest::new("https://example.com/paper.pdf");
//! if let Some(task) = engine.coordinator(request, Print).start() {
//!     task.wait().await;
//! }
//! # Ok(())
//! # }
//! ```

mod attempt;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use super::cache::{CacheResolver, CacheStrategy};
use super::client::Transport;
use super::observer::{DownloadObserver, EventSender, dispatch_events};
use super::registry::ActiveDownloads;
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
use super::validator::ContentValidator;
use super::DownloadError;

/// URL prefixes accepted by the scheme check (compared case-insensitively).
const SUPPORTED_SCHEMES: &[&str] = &["http://", "https://"];

/// Error type for download engine construction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No Tokio runtime was available to default the I/O and callback runtimes.
    #[error("download engine requires a Tokio runtime: {0}")]
    NoRuntime(#[from] TryCurrentError),
}

/// One document to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    url: String,
    headers: HashMap<String, String>,
    cache_strategy: CacheStrategy,
}

impl DownloadRequest {
    /// Creates a request with no extra headers and the default cache strategy.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            cache_strategy: CacheStrategy::default(),
        }
    }

    /// Adds one header; a repeated name replaces the earlier value.
    ///
    /// Header names are case-insensitive and stored lowercased.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Adds every header from `headers`.
    #[must_use]
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.extend(
            headers
                .into_iter()
                .map(|(k, v)| (k.into().to_ascii_lowercase(), v.into())),
        );
        self
    }

    /// Sets the cache strategy.
    #[must_use]
    pub fn with_cache_strategy(mut self, cache_strategy: CacheStrategy) -> Self {
        self.cache_strategy = cache_strategy;
        self
    }

    /// Target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Headers attached to every attempt.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Cache strategy.
    #[must_use]
    pub fn cache_strategy(&self) -> CacheStrategy {
        self.cache_strategy
    }
}

/// Services shared by every download.
///
/// Cloning is cheap; clones share the same transport, cache, validator and registry.
#[derive(Clone)]
pub struct DownloadEngine {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn CacheResolver>,
    validator: Arc<dyn ContentValidator>,
    registry: Arc<ActiveDownloads>,
    retry_policy: RetryPolicy,
    io_runtime: Handle,
    callback_runtime: Handle,
}

impl fmt::Debug for DownloadEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadEngine")
            .field("retry_policy", &self.retry_policy)
            .field("active_downloads", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl DownloadEngine {
    /// Creates an engine with a fresh registry and the default retry policy.
    ///
    /// Both the I/O and callback runtimes default to the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoRuntime`] when called outside a Tokio runtime.
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<dyn CacheResolver>,
        validator: Arc<dyn ContentValidator>,
    ) -> Result<Self, EngineError> {
        let handle = Handle::try_current()?;
        Ok(Self {
            transport,
            cache,
            validator,
            registry: Arc::new(ActiveDownloads::new()),
            retry_policy: RetryPolicy::default(),
            io_runtime: handle.clone(),
            callback_runtime: handle,
        })
    }

    /// Shares an existing registry (typically one per process).
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<ActiveDownloads>) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Runtime that runs network and file work.
    #[must_use]
    pub fn with_io_runtime(mut self, handle: Handle) -> Self {
        self.io_runtime = handle;
        self
    }

    /// Runtime on which observer callbacks are delivered.
    #[must_use]
    pub fn with_callback_runtime(mut self, handle: Handle) -> Self {
        self.callback_runtime = handle;
        self
    }

    /// The active-download registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ActiveDownloads> {
        &self.registry
    }

    /// The configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Binds `request` and `observer` into a coordinator ready to start.
    #[must_use]
    pub fn coordinator<O: DownloadObserver>(
        &self,
        request: DownloadRequest,
        observer: O,
    ) -> DownloadCoordinator<O> {
        DownloadCoordinator {
            engine: self.clone(),
            request,
            observer,
        }
    }
}

/// One download, ready to start.
pub struct DownloadCoordinator<O> {
    engine: DownloadEngine,
    request: DownloadRequest,
    observer: O,
}

impl<O> fmt::Debug for DownloadCoordinator<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadCoordinator")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl<O: DownloadObserver> DownloadCoordinator<O> {
    /// Registers the URL and schedules the download; never blocks.
    ///
    /// Returns `None` without any callback when the URL is already being
    /// downloaded. The URL stays registered until the background task ends,
    /// and is released before the terminal callback is delivered.
    pub fn start(self) -> Option<DownloadTask> {
        let Self {
            engine,
            request,
            observer,
        } = self;
        let url = request.url().to_string();

        let Some(guard) = ActiveDownloads::claim(&engine.registry, &url) else {
            info!(url = %url, "download already in progress; skipping");
            return None;
        };
        debug!(url = %url, strategy = ?request.cache_strategy(), "download accepted");

        let (tx, rx) = mpsc::unbounded_channel();
        let events = EventSender::new(tx);
        let callbacks = engine.callback_runtime.spawn(dispatch_events(rx, observer));

        let io_runtime = engine.io_runtime.clone();
        let pipeline = Pipeline {
            transport: engine.transport,
            cache: engine.cache,
            validator: engine.validator,
            registry: engine.registry,
            retry_policy: engine.retry_policy,
            request,
        };
        let span = info_span!("download", url = %url);
        let io = io_runtime.spawn(
            async move {
                let result = pipeline.run(&events).await;
                if let Err(e) = &result {
                    warn!(error = %e, "download failed");
                }
                drop(guard);
                events.finished(result);
            }
            .instrument(span),
        );

        Some(DownloadTask { url, io, callbacks })
    }
}

/// Handle to an accepted download.
///
/// Dropping it detaches the download; it keeps running to completion.
#[derive(Debug)]
pub struct DownloadTask {
    url: String,
    io: JoinHandle<()>,
    callbacks: JoinHandle<()>,
}

impl DownloadTask {
    /// The URL being downloaded.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Aborts the background work. No terminal callback is delivered and the
    /// temp file of the running attempt is removed.
    pub fn cancel(&self) {
        debug!(url = %self.url, "cancelling download");
        self.io.abort();
    }

    /// Returns true once the download and all its callbacks are done.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.io.is_finished() && self.callbacks.is_finished()
    }

    /// Waits until the download has ended and every callback has been delivered.
    pub async fn wait(self) {
        if let Err(e) = self.io.await
            && !e.is_cancelled()
        {
            warn!(url = %self.url, error = %e, "download task panicked");
        }
        if let Err(e) = self.callbacks.await {
            warn!(url = %self.url, error = %e, "observer task panicked");
        }
    }
}

/// State owned by one background download.
struct Pipeline {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn CacheResolver>,
    validator: Arc<dyn ContentValidator>,
    registry: Arc<ActiveDownloads>,
    retry_policy: RetryPolicy,
    request: DownloadRequest,
}

impl Pipeline {
    async fn run(&self, events: &EventSender) -> Result<PathBuf, DownloadError> {
        let url = self.request.url();
        check_scheme(url)?;

        let destination = self.prepare_cache().await;
        if self.request.cache_strategy().is_enabled() && self.is_valid_document(&destination).await
        {
            info!(path = %destination.display(), "serving cached document");
            return Ok(destination);
        }

        events.started();
        self.download_with_retry(&destination, events).await
    }

    /// Purges stale entries (unless disabled) and returns the artifact path.
    ///
    /// Entries of every URL still registered as active are protected, so a
    /// purge never pulls the directory out from under another download.
    async fn prepare_cache(&self) -> PathBuf {
        let strategy = self.request.cache_strategy();
        if strategy.is_enabled() {
            let cache = Arc::clone(&self.cache);
            let mut protected = self.registry.urls();
            let url = self.request.url();
            if !protected.iter().any(|active| active == url) {
                protected.push(url.to_string());
            }
            let purge =
                tokio::task::spawn_blocking(move || cache.purge_stale(strategy, &protected))
                    .await;
            match purge {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "cache purge failed; continuing"),
                Err(e) => warn!(error = %e, "cache purge task failed; continuing"),
            }
        }

        self.cache.artifact_path(self.request.url())
    }

    /// Runs the content validator on a blocking thread.
    async fn is_valid_document(&self, path: &Path) -> bool {
        let validator = Arc::clone(&self.validator);
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || validator.is_valid(&path))
            .await
            .unwrap_or(false)
    }

    /// Retries transient failures; content errors end the loop at once.
    async fn download_with_retry(
        &self,
        destination: &Path,
        events: &EventSender,
    ) -> Result<PathBuf, DownloadError> {
        let url = self.request.url();
        let policy = &self.retry_policy;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, "attempting download");

            match attempt::download_once(self, destination, events).await {
                Ok(path) => {
                    info!(path = %path.display(), attempt, "download complete");
                    return Ok(path);
                }
                Err(e) => {
                    let failure_type = classify_error(&e);
                    match policy.should_retry(failure_type, attempt) {
                        RetryDecision::Retry {
                            delay,
                            attempt: next_attempt,
                        } => {
                            info!(
                                url = %url,
                                attempt = next_attempt,
                                max_attempts = policy.max_attempts(),
                                delay_ms = delay.as_millis(),
                                error = %e,
                                "retrying download"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        RetryDecision::DoNotRetry { reason } => {
                            debug!(url = %url, %reason, "not retrying download");
                            return Err(match failure_type {
                                FailureType::Permanent => e,
                                FailureType::Transient => {
                                    DownloadError::download_failed(url, attempt, e)
                                }
                            });
                        }
                    }
                }
            }
        }
    }
}

/// Rejects anything but `http://` / `https://` URLs.
fn check_scheme(url: &str) -> Result<(), DownloadError> {
    let supported = SUPPORTED_SCHEMES.iter().any(|scheme| {
        url.get(..scheme.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(scheme))
    });
    if supported {
        Ok(())
    } else {
        Err(DownloadError::invalid_input(
            url,
            "URL must start with http:// or https://",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_scheme_accepts_http_and_https_any_case() {
        assert!(check_scheme("http://example.com/a.pdf").is_ok());
        assert!(check_scheme("https://example.com/a.pdf").is_ok());
        assert!(check_scheme("HTTPS://EXAMPLE.COM/A.PDF").is_ok());
        assert!(check_scheme("HtTp://example.com/a.pdf").is_ok());
    }

    #[test]
    fn test_check_scheme_rejects_other_inputs() {
        for url in [
            "ftp://example.com/a.pdf",
            "file:///tmp/a.pdf",
            "example.com/a.pdf",
            "",
            "http:/example.com",
            "  https://example.com/a.pdf",
            "héllo",
        ] {
            let result = check_scheme(url);
            assert!(
                matches!(result, Err(DownloadError::InvalidInput { .. })),
                "Expected InvalidInput for {url:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn test_request_builder_keeps_headers_unique() {
        let request = DownloadRequest::new("https://example.com/a.pdf")
            .with_header("Authorization", "Bearer one")
            .with_headers([("authorization", "Bearer two"), ("X-Trace", "7")])
            .with_header("AUTHORIZATION", "Bearer three")
            .with_cache_strategy(CacheStrategy::DisableCache);

        assert_eq!(request.headers().len(), 2);
        assert_eq!(
            request.headers().get("authorization").map(String::as_str),
            Some("Bearer three")
        );
        assert_eq!(
            request.headers().get("x-trace").map(String::as_str),
            Some("7")
        );
        assert_eq!(request.cache_strategy(), CacheStrategy::DisableCache);
    }

    #[test]
    fn test_engine_new_outside_runtime_fails() {
        use super::super::{DirectoryCache, HttpClient, PdfValidator};

        let result = DownloadEngine::new(
            Arc::new(HttpClient::new()),
            Arc::new(DirectoryCache::new("/tmp/pdf-fetch-test")),
            Arc::new(PdfValidator),
        );
        assert!(matches!(result, Err(EngineError::NoRuntime(_))));
    }
}

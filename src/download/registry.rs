//! Process-wide set of URLs with a download in flight.
//!
//! Membership is advisory: a URL that is already present makes a new
//! `start()` skip instead of waiting. The registry is constructed once by the
//! host and shared through `Arc`, so tests can use a fresh one.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use pdf_fetch::download::ActiveDownloads;
//!
//! let registry = Arc::new(ActiveDownloads::new());
//! let guard = ActiveDownloads::claim(&registry, "https://example.com/a.pdf").unwrap();
//! assert!(ActiveDownloads::claim(&registry, "https://example.com/a.pdf").is_none());
//! drop(guard);
//! assert!(!registry.is_active("https://example.com/a.pdf"));
//! ```

use std::sync::Arc;

use dashmap::DashSet;
use tracing::debug;

/// Concurrency-safe set of URLs currently being downloaded.
#[derive(Debug, Default)]
pub struct ActiveDownloads {
    urls: DashSet<String>,
}

impl ActiveDownloads {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `url`; returns false if it was already registered.
    pub fn register(&self, url: &str) -> bool {
        self.urls.insert(url.to_string())
    }

    /// Removes `url`, making it eligible for download again.
    pub fn unregister(&self, url: &str) {
        self.urls.remove(url);
    }

    /// Returns true while `url` is registered.
    #[must_use]
    pub fn is_active(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Snapshot of every registered URL, in no particular order.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.urls.iter().map(|url| url.key().clone()).collect()
    }

    /// Number of registered URLs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Registers `url` and returns a guard that unregisters it on drop.
    ///
    /// Returns `None` if the URL is already active.
    #[must_use]
    pub fn claim(registry: &Arc<Self>, url: &str) -> Option<ActiveDownloadGuard> {
        if !registry.register(url) {
            return None;
        }
        Some(ActiveDownloadGuard {
            registry: Arc::clone(registry),
            url: url.to_string(),
        })
    }
}

/// Keeps a URL registered for as long as it lives.
#[derive(Debug)]
pub struct ActiveDownloadGuard {
    registry: Arc<ActiveDownloads>,
    url: String,
}

impl ActiveDownloadGuard {
    /// The URL this guard holds.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for ActiveDownloadGuard {
    fn drop(&mut self) {
        debug!(url = %self.url, "releasing active download");
        self.registry.unregister(&self.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_rejects_duplicate() {
        let registry = ActiveDownloads::new();
        assert!(registry.register("https://example.com/a.pdf"));
        assert!(!registry.register("https://example.com/a.pdf"));
        assert!(registry.register("https://example.com/b.pdf"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unregister_makes_url_eligible_again() {
        let registry = ActiveDownloads::new();
        assert!(registry.register("https://example.com/a.pdf"));
        registry.unregister("https://example.com/a.pdf");
        assert!(!registry.is_active("https://example.com/a.pdf"));
        assert!(registry.register("https://example.com/a.pdf"));
    }

    #[test]
    fn test_unregister_unknown_url_is_noop() {
        let registry = ActiveDownloads::new();
        registry.unregister("https://example.com/never.pdf");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_urls_snapshot_lists_registered_urls() {
        let registry = ActiveDownloads::new();
        registry.register("https://example.com/a.pdf");
        registry.register("https://example.com/b.pdf");

        let mut urls = registry.urls();
        urls.sort();
        assert_eq!(urls, vec!["https://example.com/a.pdf", "https://example.com/b.pdf"]);

        registry.unregister("https://example.com/a.pdf");
        assert_eq!(registry.urls(), vec!["https://example.com/b.pdf"]);
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let registry = Arc::new(ActiveDownloads::new());
        let guard = ActiveDownloads::claim(&registry, "https://example.com/a.pdf");
        assert!(guard.is_some());
        assert!(registry.is_active("https://example.com/a.pdf"));
        assert!(ActiveDownloads::claim(&registry, "https://example.com/a.pdf").is_none());

        drop(guard);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_claims_admit_exactly_one() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::thread;

        let registry = Arc::new(ActiveDownloads::new());
        let admitted = Arc::new(AtomicUsize::new(0));
        let guards = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut handles = Vec::new();

        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            let admitted = Arc::clone(&admitted);
            let guards = Arc::clone(&guards);
            handles.push(thread::spawn(move || {
                if let Some(guard) = ActiveDownloads::claim(&registry, "https://example.com/a.pdf") {
                    admitted.fetch_add(1, Ordering::SeqCst);
                    guards
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .push(guard);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap_or_else(|_| panic!("claim thread panicked"));
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 1);
    }
}

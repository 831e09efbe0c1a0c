//! On-disk placement and eviction of downloaded documents.
//!
//! Every URL maps to a deterministic artifact path
//! `<root>/<key>/<key>.pdf`, where `key` is derived from a SHA-256 of the
//! URL. Each URL therefore owns its own subdirectory, and temp files created
//! next to the artifact never collide with other downloads.
//!
//! Eviction is driven by [`CacheStrategy`]:
//! - [`CacheStrategy::DisableCache`] - nothing is reused or purged; the artifact path is scratch space
//! - [`CacheStrategy::MinimizeCache`] - only protected entries survive a purge
//! - [`CacheStrategy::MaximizeCache`] - the most recently modified entries are kept, up to a limit
//!
//! Protected entries belong to URLs the caller passes as `keep_urls` (the
//! current URL and every download still in flight). They are never evicted.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use super::constants::DEFAULT_MAX_CACHED;

/// Hex characters of the URL digest used as the cache key.
const CACHE_KEY_LEN: usize = 32;

/// Caller-selected cache policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStrategy {
    /// Never reuse a cached file and never purge.
    DisableCache,
    /// Reuse the cached file; purge every other entry.
    #[default]
    MinimizeCache,
    /// Reuse the cached file; keep a bounded number of recent entries.
    MaximizeCache,
}

impl CacheStrategy {
    /// Returns true unless caching is disabled.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        self != Self::DisableCache
    }
}

/// Resolves artifact locations and evicts stale entries.
///
/// `purge_stale` does synchronous file system work and is invoked from a blocking thread.
pub trait CacheResolver: Send + Sync {
    /// Returns the deterministic artifact path for `url`.
    ///
    /// Distinct URLs must map to distinct parent directories; the caller
    /// creates the parent before writing.
    fn artifact_path(&self, url: &str) -> PathBuf;

    /// Removes stale entries according to `strategy`, never touching the
    /// entries of `keep_urls`.
    ///
    /// Eviction is best-effort: an entry that cannot be removed is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the cache root cannot be listed.
    fn purge_stale(&self, strategy: CacheStrategy, keep_urls: &[String]) -> io::Result<()>;
}

/// [`CacheResolver`] rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectoryCache {
    root: PathBuf,
    max_cached: usize,
}

impl DirectoryCache {
    /// Creates a cache rooted at `root`, keeping up to 5 entries under `MaximizeCache`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_cached: DEFAULT_MAX_CACHED,
        }
    }

    /// Sets how many entries `MaximizeCache` keeps (at least 1).
    #[must_use]
    pub fn with_max_cached(mut self, max_cached: usize) -> Self {
        self.max_cached = max_cached.max(1);
        self
    }

    /// Returns the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entries(&self) -> io::Result<Vec<(PathBuf, SystemTime)>> {
        let listing = match fs::read_dir(&self.root) {
            Ok(listing) => listing,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        for entry in listing {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_dir() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((entry.path(), modified));
        }
        Ok(entries)
    }
}

impl CacheResolver for DirectoryCache {
    fn artifact_path(&self, url: &str) -> PathBuf {
        let key = cache_key(url);
        self.root.join(&key).join(format!("{key}.pdf"))
    }

    #[instrument(skip(self, keep_urls), fields(root = %self.root.display(), protected = keep_urls.len()))]
    fn purge_stale(&self, strategy: CacheStrategy, keep_urls: &[String]) -> io::Result<()> {
        let limit = match strategy {
            CacheStrategy::DisableCache => return Ok(()),
            CacheStrategy::MinimizeCache => 0,
            CacheStrategy::MaximizeCache => self.max_cached.saturating_sub(1),
        };

        let keep: HashSet<PathBuf> = keep_urls
            .iter()
            .map(|url| self.root.join(cache_key(url)))
            .collect();
        let mut others: Vec<_> = self
            .entries()?
            .into_iter()
            .filter(|(path, _)| !keep.contains(path))
            .collect();
        // Newest first; everything past `limit` is evicted.
        others.sort_by(|a, b| b.1.cmp(&a.1));

        for (path, _) in others.into_iter().skip(limit) {
            debug!(entry = %path.display(), "evicting cache entry");
            if let Err(e) = fs::remove_dir_all(&path) {
                warn!(entry = %path.display(), error = %e, "failed to evict cache entry");
            }
        }
        Ok(())
    }
}

/// Derives the cache key for a URL.
#[must_use]
pub fn cache_key(url: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
    digest[..CACHE_KEY_LEN].to_string()
}

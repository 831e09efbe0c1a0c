//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod socket_guard;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use pdf_fetch::download::cache_key;
use pdf_fetch::{
    DirectoryCache, DownloadEngine, DownloadError, DownloadObserver, DownloadRequest, ErrorKind,
    HttpClient, PdfValidator, RetryPolicy, Transport,
};

/// Smallest byte sequence the PDF validator accepts.
pub const MINIMAL_PDF: &[u8] =
    b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF\n";

/// Short pause so retry tests stay fast.
pub const TEST_RETRY_DELAY: Duration = Duration::from_millis(20);

/// One observed callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Start,
    Progress(u64, Option<u64>),
    Success(PathBuf),
    Error {
        kind: ErrorKind,
        message: String,
        attempts: Option<u32>,
    },
}

/// Observer that records every callback, plus the thread it ran on.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Recorded>>>,
    threads: Arc<Mutex<Vec<Option<String>>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Recorded> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn threads(&self) -> Vec<Option<String>> {
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn terminal(&self) -> Option<Recorded> {
        self.events()
            .into_iter()
            .rfind(|e| matches!(e, Recorded::Success(_) | Recorded::Error { .. }))
    }

    pub fn start_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Recorded::Start))
            .count()
    }

    pub fn progress(&self) -> Vec<(u64, Option<u64>)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Progress(done, total) => Some((done, total)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Recorded) {
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(std::thread::current().name().map(str::to_string));
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl DownloadObserver for Recorder {
    fn on_download_start(&mut self) {
        self.push(Recorded::Start);
    }

    fn on_download_progress(&mut self, bytes_so_far: u64, total_bytes: Option<u64>) {
        self.push(Recorded::Progress(bytes_so_far, total_bytes));
    }

    fn on_download_success(&mut self, path: PathBuf) {
        self.push(Recorded::Success(path));
    }

    fn on_download_error(&mut self, error: DownloadError) {
        let attempts = match &error {
            DownloadError::DownloadFailed { attempts, .. } => Some(*attempts),
            _ => None,
        };
        self.push(Recorded::Error {
            kind: error.kind(),
            message: error.to_string(),
            attempts,
        });
    }
}

/// Engine over a real HTTP client, a directory cache at `cache_root` and a fast retry policy.
pub fn test_engine(cache_root: &Path) -> DownloadEngine {
    engine_with_transport(cache_root, Arc::new(HttpClient::new_with_timeouts(5, 10)))
}

/// Like [`test_engine`], but over a caller-supplied transport.
pub fn engine_with_transport(cache_root: &Path, transport: Arc<dyn Transport>) -> DownloadEngine {
    DownloadEngine::new(
        transport,
        Arc::new(DirectoryCache::new(cache_root)),
        Arc::new(PdfValidator),
    )
    .expect("test runs inside a tokio runtime")
    .with_retry_policy(RetryPolicy::new(2, TEST_RETRY_DELAY))
}

/// Starts `request` and waits for every callback; panics if the start was skipped.
pub async fn run_to_completion(engine: &DownloadEngine, request: DownloadRequest) -> Recorder {
    let recorder = Recorder::default();
    let task = engine
        .coordinator(request, recorder.clone())
        .start()
        .expect("download should be accepted");
    task.wait().await;
    recorder
}

/// Where the cache places `url`.
pub fn artifact_path(cache_root: &Path, url: &str) -> PathBuf {
    let key = cache_key(url);
    cache_root.join(&key).join(format!("{key}.pdf"))
}

/// Writes `bytes` at the artifact location for `url`.
pub fn seed_artifact(cache_root: &Path, url: &str, bytes: &[u8]) -> PathBuf {
    let path = artifact_path(cache_root, url);
    std::fs::create_dir_all(path.parent().expect("artifact has a parent")).expect("create dir");
    std::fs::write(&path, bytes).expect("write artifact");
    path
}

/// Leftover `.part` files anywhere under `cache_root`.
pub fn temp_files(cache_root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Ok(dirs) = std::fs::read_dir(cache_root) else {
        return found;
    };
    for dir in dirs.flatten() {
        let Ok(files) = std::fs::read_dir(dir.path()) else {
            continue;
        };
        for file in files.flatten() {
            if file.file_name().to_string_lossy().ends_with(".part") {
                found.push(file.path());
            }
        }
    }
    found
}

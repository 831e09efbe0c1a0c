//! Lifecycle callbacks for a single download.
//!
//! The background task never calls the observer directly. It pushes
//! [`DownloadEvent`]s into a channel that is drained on the callback runtime,
//! so observer code always runs there and sees events in emission order.
//!
//! Per accepted `start()`, an observer sees at most one `on_download_start`,
//! zero or more `on_download_progress` ticks with non-decreasing byte counts,
//! and then exactly one of `on_download_success` / `on_download_error`
//! (unless the download is cancelled, in which case nothing terminal fires).

use std::path::PathBuf;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use super::DownloadError;

/// Receives lifecycle callbacks for one download.
pub trait DownloadObserver: Send + 'static {
    /// The network phase is about to begin (not called on cache hits).
    fn on_download_start(&mut self) {}

    /// `bytes_so_far` bytes of the body have been written; `total_bytes` is the
    /// announced length, if any.
    fn on_download_progress(&mut self, bytes_so_far: u64, total_bytes: Option<u64>) {
        let _ = (bytes_so_far, total_bytes);
    }

    /// The validated document is available at `path`.
    fn on_download_success(&mut self, path: PathBuf);

    /// The download failed for good.
    fn on_download_error(&mut self, error: DownloadError);
}

/// One observer callback, in transit from the background task.
#[derive(Debug)]
pub(crate) enum DownloadEvent {
    Started,
    Progress { bytes_so_far: u64, total: Option<u64> },
    Succeeded(PathBuf),
    Failed(DownloadError),
}

/// Sending half used by the background task.
///
/// A closed channel means the caller went away; events are then dropped.
#[derive(Debug, Clone)]
pub(crate) struct EventSender {
    tx: UnboundedSender<DownloadEvent>,
}

impl EventSender {
    pub(crate) fn new(tx: UnboundedSender<DownloadEvent>) -> Self {
        Self { tx }
    }

    pub(crate) fn started(&self) {
        let _ = self.tx.send(DownloadEvent::Started);
    }

    pub(crate) fn progress(&self, bytes_so_far: u64, total: Option<u64>) {
        let _ = self.tx.send(DownloadEvent::Progress {
            bytes_so_far,
            total,
        });
    }

    pub(crate) fn finished(&self, result: Result<PathBuf, DownloadError>) {
        let event = match result {
            Ok(path) => DownloadEvent::Succeeded(path),
            Err(error) => DownloadEvent::Failed(error),
        };
        let _ = self.tx.send(event);
    }
}

/// Delivers queued events to `observer` until a terminal event or channel close.
pub(crate) async fn dispatch_events<O: DownloadObserver>(
    mut rx: UnboundedReceiver<DownloadEvent>,
    mut observer: O,
) {
    while let Some(event) = rx.recv().await {
        match event {
            DownloadEvent::Started => observer.on_download_start(),
            DownloadEvent::Progress {
                bytes_so_far,
                total,
            } => observer.on_download_progress(bytes_so_far, total),
            DownloadEvent::Succeeded(path) => {
                observer.on_download_success(path);
                return;
            }
            DownloadEvent::Failed(error) => {
                observer.on_download_error(error);
                return;
            }
        }
    }
}

//! Progress bars for CLI downloads.

use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use pdf_fetch::{DownloadError, DownloadObserver};
use tokio::sync::oneshot;

const BAR_TEMPLATE: &str = "{msg:40!} [{bar:30}] {bytes}/{total_bytes} {bytes_per_sec}";
const SPINNER_TEMPLATE: &str = "{spinner} {msg:40!} {bytes} {bytes_per_sec}";

/// Renders one download on a progress bar and reports its outcome once.
pub(crate) struct BarObserver {
    bar: ProgressBar,
    outcome: Option<oneshot::Sender<Result<PathBuf, String>>>,
}

impl BarObserver {
    pub(crate) fn new(
        bar: ProgressBar,
        label: &str,
        outcome: oneshot::Sender<Result<PathBuf, String>>,
    ) -> Self {
        bar.set_message(label.to_string());
        Self {
            bar,
            outcome: Some(outcome),
        }
    }

    fn report(&mut self, result: Result<PathBuf, String>) {
        if let Some(tx) = self.outcome.take() {
            let _ = tx.send(result);
        }
    }
}

impl DownloadObserver for BarObserver {
    fn on_download_start(&mut self) {
        self.bar.set_style(
            ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
    }

    fn on_download_progress(&mut self, bytes_so_far: u64, total_bytes: Option<u64>) {
        if let Some(total) = total_bytes
            && self.bar.length() != Some(total)
        {
            self.bar.set_length(total);
            self.bar.set_style(
                ProgressStyle::with_template(BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
        }
        self.bar.set_position(bytes_so_far);
    }

    fn on_download_success(&mut self, path: PathBuf) {
        self.bar.finish_and_clear();
        self.report(Ok(path));
    }

    fn on_download_error(&mut self, error: DownloadError) {
        self.bar.abandon();
        self.report(Err(error.to_string()));
    }
}

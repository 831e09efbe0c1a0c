//! CLI entry point for pdf-fetch.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};
use pdf_fetch::{
    ActiveDownloads, DirectoryCache, DownloadEngine, DownloadRequest, HttpClient, PdfValidator,
    RetryPolicy,
};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

mod cli;
mod progress;

use cli::Args;
use progress::BarObserver;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let cache_dir = args
        .cache_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("pdf-fetch"));
    info!(cache_dir = %cache_dir.display(), urls = args.urls.len(), "pdf-fetch starting");

    let client = HttpClient::new_with_timeouts(args.connect_timeout, args.read_timeout);
    let cache = DirectoryCache::new(&cache_dir).with_max_cached(usize::from(args.max_cached));
    let retry_policy = RetryPolicy::new(
        u32::from(args.max_retries),
        Duration::from_millis(args.retry_delay),
    );
    let engine = DownloadEngine::new(Arc::new(client), Arc::new(cache), Arc::new(PdfValidator))?
        .with_registry(Arc::new(ActiveDownloads::new()))
        .with_retry_policy(retry_policy);

    let bars = if args.quiet {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    } else {
        MultiProgress::new()
    };

    let mut pending = Vec::new();
    for url in &args.urls {
        let request = DownloadRequest::new(url.as_str())
            .with_headers(args.headers.iter().cloned())
            .with_cache_strategy(args.cache_strategy.into());
        let (tx, rx) = oneshot::channel();
        let observer = BarObserver::new(bars.add(ProgressBar::no_length()), url, tx);

        match engine.coordinator(request, observer).start() {
            Some(task) => pending.push((url.as_str(), task, rx)),
            None => warn!(url = %url, "duplicate URL skipped"),
        }
    }

    let attempted = pending.len();
    let mut failed = 0usize;
    for (url, task, rx) in pending {
        task.wait().await;
        match rx.await {
            Ok(Ok(path)) => println!("{}", path.display()),
            Ok(Err(message)) => {
                failed += 1;
                error!(url = %url, error = %message, "download failed");
            }
            Err(_) => {
                failed += 1;
                error!(url = %url, "download ended without a result");
            }
        }
    }

    info!(
        completed = attempted - failed,
        failed,
        total = attempted,
        "pdf-fetch finished"
    );

    if failed > 0 {
        bail!("{failed} of {attempted} downloads failed");
    }
    Ok(())
}

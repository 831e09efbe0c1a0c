//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use pdf_fetch::download::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use pdf_fetch::{CacheStrategy, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_CACHED};

/// Fetch documents into a local cache.
///
/// Each URL is downloaded at most once at a time, retried on transient
/// failures, checked to really be a PDF, and published atomically. The cached
/// path of every successful download is printed on stdout.
#[derive(Parser, Debug)]
#[command(name = "pdf-fetch")]
#[command(author, version, about)]
pub struct Args {
    /// Document URLs (http:// or https://)
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Cache directory (defaults to <system temp>/pdf-fetch)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Cache reuse and eviction policy
    #[arg(long, value_enum, default_value_t = CacheMode::Minimize)]
    pub cache_strategy: CacheMode,

    /// Entries kept by the `maximize` strategy (1-1000)
    #[arg(long, default_value_t = DEFAULT_MAX_CACHED as u16, value_parser = clap::value_parser!(u16).range(1..=1000))]
    pub max_cached: u16,

    /// Extra request header, as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Total download attempts per URL (1-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_ATTEMPTS as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: u8,

    /// Pause between attempts in milliseconds (max 60000)
    #[arg(long, default_value_t = 2000, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub retry_delay: u64,

    /// HTTP connect timeout in seconds (1-3600)
    #[arg(long, default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: u64,

    /// HTTP read timeout in seconds (1-3600)
    #[arg(long, default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: u64,
}

/// CLI spelling of [`CacheStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheMode {
    /// Always download; never reuse or purge
    Disable,
    /// Reuse this URL's cached file; purge every other entry
    Minimize,
    /// Reuse cached files; keep the most recent `--max-cached` entries
    Maximize,
}

impl From<CacheMode> for CacheStrategy {
    fn from(mode: CacheMode) -> Self {
        match mode {
            CacheMode::Disable => Self::DisableCache,
            CacheMode::Minimize => Self::MinimizeCache,
            CacheMode::Maximize => Self::MaximizeCache,
        }
    }
}

/// Parses `Name: value` into a header pair.
fn parse_header(raw: &str) -> Result<(String, String), String> {
    let Some((name, value)) = raw.split_once(':') else {
        return Err(format!("expected \"Name: value\", got {raw:?}"));
    };
    let name = name.trim();
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(format!("invalid header name {name:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

//! Error types for the download module.
//!
//! Every failure carries the URL or path it relates to. The variants map onto
//! four caller-facing classes via [`DownloadError::kind`]; retry decisions are
//! made from the variant alone (see [`classify_error`](super::classify_error)).

use std::path::PathBuf;

use thiserror::Error;

/// Boxed transport-level cause, so non-reqwest transports can report failures too.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Caller-facing error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is unusable (bad URL scheme, illegal header).
    InvalidInput,
    /// The server answered with something that is not the expected document.
    InvalidContent,
    /// Non-success HTTP status, or the retry budget ran out.
    DownloadFailed,
    /// Connection, stream, or file system failure.
    Io,
}

/// Errors that can occur during a download.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// URL scheme is not `http://` or `https://`, or the request could not be built.
    #[error("invalid input for {url}: {reason}")]
    InvalidInput {
        /// The rejected URL.
        url: String,
        /// Why the input was rejected.
        reason: String,
    },

    /// Wrong MIME type or structurally invalid bytes.
    #[error("invalid content from {url}: {reason}")]
    InvalidContent {
        /// The URL that produced the content.
        url: String,
        /// What was wrong with the content.
        reason: String,
    },

    /// HTTP error response (anything outside 2xx).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Network-level error (DNS resolution, connection refused, TLS, broken stream).
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying transport error.
        #[source]
        source: BoxError,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The response carried no body bytes.
    #[error("empty response body from {url}")]
    EmptyBody {
        /// The URL with the empty response.
        url: String,
    },

    /// File system error (temp file, write, rename, delete).
    #[error("IO error at {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Every attempt failed; wraps the last failure.
    #[error("download of {url} failed after {attempts} attempts: {source}")]
    DownloadFailed {
        /// The URL that could not be downloaded.
        url: String,
        /// Attempts made before giving up.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        source: Box<DownloadError>,
    },
}

impl DownloadError {
    /// Creates an invalid input error.
    pub fn invalid_input(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid content error.
    pub fn invalid_content(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidContent {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a network error from any transport error.
    pub fn network(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Network {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an empty body error.
    pub fn empty_body(url: impl Into<String>) -> Self {
        Self::EmptyBody { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wraps the last attempt's error once the retry budget is spent.
    pub fn download_failed(url: impl Into<String>, attempts: u32, last: DownloadError) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            attempts,
            source: Box::new(last),
        }
    }

    /// Returns the caller-facing class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::InvalidContent { .. } => ErrorKind::InvalidContent,
            Self::HttpStatus { .. } | Self::DownloadFailed { .. } => ErrorKind::DownloadFailed,
            Self::Network { .. } | Self::Timeout { .. } | Self::EmptyBody { .. } | Self::Io { .. } => {
                ErrorKind::Io
            }
        }
    }
}

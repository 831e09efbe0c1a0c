//! HTTP transport used by the download coordinator.
//!
//! [`Transport`] is the seam between the coordinator and the network: it
//! executes one GET with the caller's headers and hands back status, the
//! metadata the coordinator validates, and the body as a stream. Status codes
//! are *not* interpreted here.
//!
//! [`HttpClient`] is the reqwest-backed implementation. Build it once and
//! share it (it is cheap to clone) so connections are pooled across downloads.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use tracing::{debug, instrument};

use super::DownloadError;
use super::constants::{CONNECT_TIMEOUT_SECS, MAX_REDIRECTS, READ_TIMEOUT_SECS};
use crate::user_agent;

/// Streamed response body; every chunk error is already mapped to a [`DownloadError`].
pub type BodyStream = BoxStream<'static, Result<Bytes, DownloadError>>;

/// Response handed from a [`Transport`] to the coordinator.
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw `Content-Type` header, if the server sent one.
    pub content_type: Option<String>,
    /// Body length announced by the server, if known.
    pub content_length: Option<u64>,
    /// Body stream; `None` when the response has no body at all.
    pub body: Option<BodyStream>,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

impl TransportResponse {
    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes a single request for the coordinator.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a GET for `url` with every entry of `headers` attached.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] when no response could be obtained
    /// (connection failure, timeout, unbuildable request).
    async fn execute(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<TransportResponse, DownloadError>;
}

/// reqwest-backed [`Transport`].
///
/// Redirects are followed (up to 10), protocol is negotiated via ALPN
/// (HTTP/2 preferred, HTTP/1.1 fallback), gzip is decoded transparently.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts (30s connect, 5min read).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = build_client(connect_timeout_secs, read_timeout_secs)
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpClient {
    #[instrument(skip(self, headers), fields(url = %url, headers = headers.len()))]
    async fn execute(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<TransportResponse, DownloadError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else if e.is_builder() {
                DownloadError::invalid_input(url, format!("request could not be built: {e}"))
            } else {
                DownloadError::network(url, e)
            }
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(std::string::ToString::to_string);
        let content_length = response.content_length();
        debug!(status, ?content_type, ?content_length, "response received");

        let stream_url = url.to_string();
        let body: BodyStream = response
            .bytes_stream()
            .map(move |chunk| {
                chunk.map_err(|e| {
                    if e.is_timeout() {
                        DownloadError::timeout(stream_url.clone())
                    } else {
                        DownloadError::network(stream_url.clone(), e)
                    }
                })
            })
            .boxed();

        Ok(TransportResponse {
            status,
            content_type,
            content_length,
            body: Some(body),
        })
    }
}

fn build_client(
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(read_timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .user_agent(user_agent::default_download_user_agent())
        .build()
}

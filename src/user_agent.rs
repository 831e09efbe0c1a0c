//! User-Agent string for download requests.

/// Product token sent before the version.
const PRODUCT: &str = "pdf-fetch";

/// Default User-Agent for download requests (identifies the tool).
#[must_use]
pub(crate) fn default_download_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (document-downloader)")
}

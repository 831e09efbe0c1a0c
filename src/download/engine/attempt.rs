//! A single download attempt: artifact directory, temp file, request, checks,
//! stream, publish, re-validate.
//!
//! The temp file lives in the artifact's own directory so the publish rename
//! never crosses file systems. It is a [`TempPath`], so every early return
//! (and task cancellation) deletes it.

use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempPath};
use tracing::{debug, warn};

use super::Pipeline;
use crate::download::DownloadError;
use crate::download::constants::ACCEPTED_CONTENT_TYPES;
use crate::download::observer::EventSender;
use crate::download::writer::stream_to_file;

const TEMP_PREFIX: &str = ".pdf-fetch-";
const TEMP_SUFFIX: &str = ".part";

pub(super) async fn download_once(
    pipeline: &Pipeline,
    destination: &Path,
    events: &EventSender,
) -> Result<PathBuf, DownloadError> {
    let url = pipeline.request.url();
    let directory = destination.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(directory)
        .await
        .map_err(|e| DownloadError::io(directory, e))?;

    let (file, temp_path) = create_temp_file(directory).await?;
    debug!(temp = %temp_path.display(), "created temp file");

    if tokio::fs::try_exists(destination).await.unwrap_or(false)
        && !pipeline.is_valid_document(destination).await
    {
        debug!(path = %destination.display(), "removing invalid artifact before download");
        remove_file_if_exists(destination).await?;
    }

    let response = pipeline
        .transport
        .execute(url, pipeline.request.headers())
        .await?;
    if !response.is_success() {
        return Err(DownloadError::http_status(url, response.status));
    }
    check_content_type(url, response.content_type.as_deref())?;

    let total = response.content_length;
    let body = response.body.ok_or_else(|| DownloadError::empty_body(url))?;
    let written = stream_to_file(
        body,
        tokio::fs::File::from_std(file),
        &temp_path,
        total,
        |bytes_so_far, total| events.progress(bytes_so_far, total),
    )
    .await?;
    if written == 0 {
        return Err(DownloadError::empty_body(url));
    }

    publish(temp_path, destination).await?;

    if !pipeline.is_valid_document(destination).await {
        if let Err(e) = remove_file_if_exists(destination).await {
            warn!(error = %e, "failed to delete invalid download");
        }
        return Err(DownloadError::invalid_content(
            url,
            "downloaded file is not a well-formed document",
        ));
    }

    debug!(path = %destination.display(), bytes = written, "published download");
    Ok(destination.to_path_buf())
}

/// Accepts a missing `Content-Type`, or one naming an accepted document type.
fn check_content_type(url: &str, content_type: Option<&str>) -> Result<(), DownloadError> {
    let Some(content_type) = content_type else {
        return Ok(());
    };
    let lowered = content_type.to_ascii_lowercase();
    if ACCEPTED_CONTENT_TYPES
        .iter()
        .any(|accepted| lowered.contains(accepted))
    {
        Ok(())
    } else {
        Err(DownloadError::invalid_content(
            url,
            format!("unexpected content type {content_type}"),
        ))
    }
}

async fn create_temp_file(directory: &Path) -> Result<(File, TempPath), DownloadError> {
    let dir = directory.to_path_buf();
    let created = tokio::task::spawn_blocking(move || {
        Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&dir)
    })
    .await
    .map_err(|e| DownloadError::io(directory, std::io::Error::other(e)))?
    .map_err(|e| DownloadError::io(directory, e))?;
    Ok(created.into_parts())
}

/// Renames the temp file onto `destination`; on failure the temp file is removed.
async fn publish(temp_path: TempPath, destination: &Path) -> Result<(), DownloadError> {
    let target = destination.to_path_buf();
    tokio::task::spawn_blocking(move || temp_path.persist(&target).map_err(|e| e.error))
        .await
        .map_err(|e| DownloadError::io(destination, std::io::Error::other(e)))?
        .map_err(|e| DownloadError::io(destination, e))
}

async fn remove_file_if_exists(path: &Path) -> Result<(), DownloadError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DownloadError::io(path, e)),
    }
}

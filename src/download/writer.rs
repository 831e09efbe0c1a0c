//! Streams a response body into a file with progress reporting.

use std::path::Path;

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::DownloadError;
use super::client::BodyStream;

/// Copies `body` into `file`, returning the number of bytes written.
///
/// `on_progress(bytes_so_far, total)` is invoked after every chunk, so the
/// byte counts it sees never decrease. A chunk error stops the copy without a
/// further tick. Data is flushed and synced to disk before returning.
pub(crate) async fn stream_to_file<F>(
    mut body: BodyStream,
    file: File,
    file_path: &Path,
    total: Option<u64>,
    mut on_progress: F,
) -> Result<u64, DownloadError>
where
    F: FnMut(u64, Option<u64>),
{
    let mut writer = BufWriter::new(file);
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = body.next().await {
        let chunk = chunk_result?;
        if chunk.is_empty() {
            continue;
        }

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
        on_progress(bytes_written, total);
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;
    writer
        .into_inner()
        .sync_all()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bytes::Bytes;
    use futures_util::stream;
    use tempfile::TempDir;

    use super::*;

    fn body_of(chunks: Vec<Result<Bytes, DownloadError>>) -> BodyStream {
        stream::iter(chunks).boxed()
    }

    #[tokio::test]
    async fn test_stream_to_file_writes_all_chunks_and_reports_progress() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.pdf");
        let file = File::create(&path).await.unwrap();

        let body = body_of(vec![
            Ok(Bytes::from_static(b"%PDF-")),
            Ok(Bytes::from_static(b"")),
            Ok(Bytes::from_static(b"1.7 data")),
        ]);
        let mut ticks = Vec::new();
        let written = stream_to_file(body, file, &path, Some(13), |done, total| {
            ticks.push((done, total));
        })
        .await
        .unwrap();

        assert_eq!(written, 13);
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7 data");
        assert_eq!(ticks, vec![(5, Some(13)), (13, Some(13))]);
    }

    #[tokio::test]
    async fn test_stream_to_file_stops_ticking_on_chunk_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.pdf");
        let file = File::create(&path).await.unwrap();

        let body = body_of(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(DownloadError::network("https://example.com/a.pdf", "connection reset")),
            Ok(Bytes::from_static(b"never")),
        ]);
        let mut ticks = Vec::new();
        let result = stream_to_file(body, file, &path, None, |done, total| {
            ticks.push((done, total));
        })
        .await;

        assert!(matches!(result, Err(DownloadError::Network { .. })));
        assert_eq!(ticks, vec![(3, None)]);
    }

    #[tokio::test]
    async fn test_stream_to_file_empty_body_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.pdf");
        let file = File::create(&path).await.unwrap();

        let mut calls = 0;
        let written = stream_to_file(body_of(Vec::new()), file, &path, Some(0), |_, _| calls += 1)
            .await
            .unwrap();
        assert_eq!(written, 0);
        assert_eq!(calls, 0);
    }
}

//! Structural checks on downloaded files.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use tracing::debug;

use super::constants::PDF_PROBE_LEN;

/// Answers whether a file on disk is a well-formed instance of the expected format.
///
/// Implementations run on a blocking thread and may do synchronous I/O.
pub trait ContentValidator: Send + Sync {
    /// Returns true when the file at `path` exists and looks well-formed.
    fn is_valid(&self, path: &Path) -> bool;
}

/// Accepts files that carry a `%PDF-` header near the start and a `%%EOF`
/// trailer near the end.
///
/// Readers tolerate a little junk before the header and after the trailer, so
/// both markers are searched for within the first/last 1024 bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfValidator;

const PDF_HEADER: &[u8] = b"%PDF-";
const PDF_TRAILER: &[u8] = b"%%EOF";

impl ContentValidator for PdfValidator {
    fn is_valid(&self, path: &Path) -> bool {
        match probe_pdf(path) {
            Ok(valid) => valid,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "pdf probe failed");
                false
            }
        }
    }
}

fn probe_pdf(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    if len < (PDF_HEADER.len() + PDF_TRAILER.len()) as u64 {
        return Ok(false);
    }

    let head = read_window(&mut file, 0, PDF_PROBE_LEN.min(len))?;
    if !contains(&head, PDF_HEADER) {
        return Ok(false);
    }

    let tail_start = len.saturating_sub(PDF_PROBE_LEN);
    let tail = read_window(&mut file, tail_start, len - tail_start)?;
    Ok(contains(&tail, PDF_TRAILER))
}

#[allow(clippy::cast_possible_truncation)]
fn read_window(file: &mut File, offset: u64, len: u64) -> std::io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len as usize];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

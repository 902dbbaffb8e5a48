//! Input resolution: turn a path, URL or byte buffer into a local PDF file.
//!
//! pdfium opens documents by path, so every input ends up as a file on disk.
//! Downloads and in-memory buffers go to a temp location owned by the
//! returned [`PdfSource`]; it is removed when the source is dropped. The
//! `%PDF` magic is checked up front so a mislabelled file fails with
//! [`MarksheetError::NotAPdf`] instead of a pdfium parse error.

use crate::error::MarksheetError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF ready for pdfium, plus whatever keeps it alive.
#[derive(Debug)]
pub enum PdfSource {
    /// A file the caller already had.
    Local(PathBuf),
    /// Downloaded into a temp directory.
    Downloaded { path: PathBuf, _dir: TempDir },
    /// Spilled from an in-memory buffer.
    Buffered(NamedTempFile),
}

impl PdfSource {
    pub fn path(&self) -> &Path {
        match self {
            PdfSource::Local(p) => p,
            PdfSource::Downloaded { path, .. } => path,
            PdfSource::Buffered(file) => file.path(),
        }
    }
}

/// `true` for `http://` and `https://` inputs.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a user-supplied path or URL.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<PdfSource, MarksheetError> {
    if is_url(input) {
        download(input, timeout_secs).await
    } else {
        open_local(Path::new(input))
    }
}

/// Write `bytes` to a temp file after checking the magic.
pub fn spill_bytes(bytes: &[u8]) -> Result<PdfSource, MarksheetError> {
    let mut file = NamedTempFile::new().map_err(|e| MarksheetError::Internal(e.to_string()))?;
    check_magic(bytes, file.path())?;
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .map_err(|e| MarksheetError::Internal(format!("failed to write temp PDF: {e}")))?;
    debug!("Spilled {} bytes to {}", bytes.len(), file.path().display());
    Ok(PdfSource::Buffered(file))
}

fn open_local(path: &Path) -> Result<PdfSource, MarksheetError> {
    let mut file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => MarksheetError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => MarksheetError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let mut head = [0u8; 4];
    let read = file.read(&mut head).unwrap_or(0);
    check_magic(&head[..read], path)?;

    debug!("Resolved local PDF: {}", path.display());
    Ok(PdfSource::Local(path.to_path_buf()))
}

fn check_magic(bytes: &[u8], path: &Path) -> Result<(), MarksheetError> {
    if bytes.starts_with(PDF_MAGIC) {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(MarksheetError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })
}

async fn download(url: &str, timeout_secs: u64) -> Result<PdfSource, MarksheetError> {
    info!("Downloading gazette from {}", url);

    let failed = |reason: String| MarksheetError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            MarksheetError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(classify)?;
    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(classify)?;

    let dir = TempDir::new().map_err(|e| MarksheetError::Internal(e.to_string()))?;
    let path = dir.path().join(file_name(url));
    check_magic(&bytes, &path)?;

    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| MarksheetError::Internal(format!("failed to write temp PDF: {e}")))?;

    info!("Downloaded {} bytes to {}", bytes.len(), path.display());
    Ok(PdfSource::Downloaded { path, _dir: dir })
}

/// Last path segment of the URL when it looks like a file name.
fn file_name(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "gazette.pdf".to_string())
}

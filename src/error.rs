//! Error types for the marksheet-parser library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`MarksheetError`] is **fatal**: the document cannot be processed at all
//!   (unreadable file, wrong password, unsupported semester). Returned as
//!   `Err(MarksheetError)` from the top-level `parse*` functions and never
//!   accompanied by partial records.
//!
//! * [`SkipReason`] is **non-fatal**: a single student block did not fit its
//!   semester grammar. The block is dropped, the reason is stored in
//!   [`crate::output::ParseReport::skipped`], and parsing continues with the
//!   next block.
//!
//! A readable document that yields zero records is *not* an error: callers
//! report "no records found" for an empty `records` list and "could not
//! process file" for an `Err`.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the marksheet-parser library.
///
/// Block-level failures use [`SkipReason`] and are collected in the
/// report rather than propagated here.
#[derive(Debug, Error)]
pub enum MarksheetError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium returned an error while reading the text layer of a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, or place the platform library\n\
next to the executable / in the current directory.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// The requested semester has no known gazette template.
    #[error("Unsupported semester '{requested}'. Supported: {supported}")]
    UnsupportedSemester { requested: String, supported: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Runtime errors ────────────────────────────────────────────────────
    /// The whole document exceeded the configured parse timeout.
    #[error("Parsing timed out after {secs}s; no records were produced")]
    Timeout { secs: u64 },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV writer rejected a row or could not flush.
    #[error("Failed to render CSV: {0}")]
    CsvWriteFailed(#[from] ::csv::Error),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarksheetError {
    /// `true` for errors raised before any document was opened.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            MarksheetError::UnsupportedSemester { .. } | MarksheetError::InvalidConfig(_)
        )
    }
}

/// Why a single student block was dropped.
///
/// Stored with its block index in [`crate::output::SkippedBlock`]. Never
/// escalates to a [`MarksheetError`].
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum SkipReason {
    /// The chunk carried no subject-mark tokens (header leftovers, legends).
    #[error("no subject-mark tokens")]
    NoMarkTokens,

    /// Fewer lines than the layout needs.
    #[error("too few lines: found {found}, need {required}")]
    TooFewLines { found: usize, required: usize },

    /// The block did not match the layout's record pattern.
    #[error("layout mismatch: {detail}")]
    ShapeMismatch { detail: String },

    /// A required field was empty after trimming.
    #[error("missing required field '{field}'")]
    MissingField { field: String },
}

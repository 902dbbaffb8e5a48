//! Glyph extraction: read positioned text runs from each page via pdfium.
//!
//! pdfium wraps a C++ library with process-global state, so extraction runs
//! inside `tokio::task::spawn_blocking`. Runs are pdfium text *segments*:
//! spans of characters sharing a baseline and font. Their loose bounds give
//! the `x`, `y` (bottom edge) and `width` the reflow stage needs.

use crate::config::PageSelection;
use crate::error::MarksheetError;
use crate::pipeline::reflow::PositionedGlyphRun;
use crate::progress::ProgressCallback;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Glyph runs for each selected page, in page order.
#[derive(Debug, Clone, Default)]
pub struct ExtractedPages {
    /// Pages in the document.
    pub total_pages: usize,
    /// One entry per selected page.
    pub pages: Vec<Vec<PositionedGlyphRun>>,
}

/// Extract glyph runs from the selected pages of a PDF.
pub async fn extract_glyph_runs(
    pdf_path: &Path,
    password: Option<&str>,
    selection: &PageSelection,
    progress: Option<ProgressCallback>,
) -> Result<ExtractedPages, MarksheetError> {
    let path = pdf_path.to_path_buf();
    let password = password.map(str::to_string);
    let selection = selection.clone();

    tokio::task::spawn_blocking(move || {
        extract_blocking(&path, password.as_deref(), &selection, progress.as_ref())
    })
    .await
    .map_err(|e| MarksheetError::Internal(format!("extraction task panicked: {e}")))?
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the working directory,
/// then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, MarksheetError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => {
            debug!("Binding pdfium from PDFIUM_LIB_PATH={}", path);
            Pdfium::bind_to_library(&path)
        }
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| MarksheetError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

fn extract_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    selection: &PageSelection,
    progress: Option<&ProgressCallback>,
) -> Result<ExtractedPages, MarksheetError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| classify_load_error(pdf_path, password.is_some(), &e))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    if let Some(page) = selection.first_out_of_range(total_pages) {
        return Err(MarksheetError::PageOutOfRange {
            page,
            total: total_pages,
        });
    }
    let wanted = selection.to_indices(total_pages);
    if let Some(cb) = progress {
        cb.on_extraction_start(wanted.len());
    }

    let mut extracted = Vec::with_capacity(wanted.len());
    for (idx, page) in pages.iter().enumerate() {
        if wanted.binary_search(&idx).is_err() {
            continue;
        }

        let text = page
            .text()
            .map_err(|e| MarksheetError::TextExtractionFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;

        let runs: Vec<PositionedGlyphRun> = text
            .segments()
            .iter()
            .map(|segment| {
                let rect = segment.bounds();
                let left = rect.left().value;
                PositionedGlyphRun::new(
                    segment.text(),
                    left,
                    rect.bottom().value,
                    (rect.right().value - left).abs(),
                )
            })
            .collect();

        debug!("Page {} → {} glyph runs", idx + 1, runs.len());
        if let Some(cb) = progress {
            cb.on_page_extracted(idx + 1, total_pages, runs.len());
        }
        extracted.push(runs);
    }

    Ok(ExtractedPages {
        total_pages,
        pages: extracted,
    })
}

fn classify_load_error(path: &Path, had_password: bool, e: &PdfiumError) -> MarksheetError {
    let detail = format!("{e:?}");
    let path: PathBuf = path.to_path_buf();
    if detail.to_ascii_lowercase().contains("password") {
        if had_password {
            MarksheetError::WrongPassword { path }
        } else {
            MarksheetError::PasswordRequired { path }
        }
    } else {
        MarksheetError::CorruptPdf { path, detail }
    }
}

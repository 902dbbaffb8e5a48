//! Parse entry points.
//!
//! [`parse_pdf`] is the primary API: resolve the input, read the text
//! layer, reflow, strip boilerplate, segment, extract and assemble. The
//! text-only stages are exposed separately as [`parse_text`] and
//! [`parse_glyph_pages`] (with [`extract_text`] producing their input) so callers with pre-extracted text (or tests) can
//! skip pdfium entirely.
//!
//! A document either parses completely or fails with a [`MarksheetError`];
//! there is no partial result on timeout or extraction failure. The parse
//! timeout covers input resolution, extraction and the text stages, which
//! run on the blocking pool so the deadline can fire while they work. The
//! synchronous [`parse_text`] and [`parse_glyph_pages`] have no timeout;
//! [`parse_text_file`] is the timed entry point for pre-extracted text. Individual
//! blocks that do not fit the grammar are reported in
//! [`ParseReport::skipped`] instead.

use crate::config::ParseConfig;
use crate::csv;
use crate::error::{MarksheetError, SkipReason};
use crate::grammar::grammar_for;
use crate::output::{ParseReport, ParseStats, SkippedBlock, StudentRecord};
use crate::pipeline::noise::{strip_noise, NoiseRule};
use crate::pipeline::reflow::{reflow_document, PositionedGlyphRun};
use crate::pipeline::{assemble, glyphs, input};
use crate::semester::SubjectSlot;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Parse a gazette PDF from a local path or HTTP/HTTPS URL.
///
/// # Errors
/// Only document-level failures: unreadable or non-PDF input, encryption,
/// pdfium binding, page selection outside the document, or the configured
/// timeout. A readable document with no matching blocks is `Ok` with an
/// empty `records` list.
pub async fn parse_pdf(
    input: impl AsRef<str>,
    config: &ParseConfig,
) -> Result<ParseReport, MarksheetError> {
    let input = input.as_ref();
    info!("Parsing {} as {}", input, config.semester);

    let work = async {
        let source = input::resolve_input(input, config.download_timeout_secs).await?;
        parse_source(source.path(), config).await
    };

    with_timeout(work, config.parse_timeout_secs).await
}

/// Parse PDF bytes held in memory.
///
/// The bytes are spilled to a managed temp file that is removed on return.
pub async fn parse_pdf_bytes(
    bytes: &[u8],
    config: &ParseConfig,
) -> Result<ParseReport, MarksheetError> {
    let source = input::spill_bytes(bytes)?;
    with_timeout(parse_source(source.path(), config), config.parse_timeout_secs).await
}

/// Synchronous wrapper around [`parse_pdf`].
///
/// Creates a temporary tokio runtime internally.
pub fn parse_pdf_sync(
    input: impl AsRef<str>,
    config: &ParseConfig,
) -> Result<ParseReport, MarksheetError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| MarksheetError::Internal(format!("failed to create tokio runtime: {e}")))?
        .block_on(parse_pdf(input, config))
}

/// Parse a PDF and write the CSV straight to `output_path`.
///
/// Uses an atomic write (temp file + rename) so a failed parse never leaves
/// a truncated CSV behind.
pub async fn parse_to_csv_file(
    input: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ParseConfig,
) -> Result<ParseReport, MarksheetError> {
    let report = parse_pdf(input, config).await?;
    let rendered = csv::to_csv(&report)?;
    write_atomic(output_path.as_ref(), rendered.as_bytes()).await?;
    Ok(report)
}

/// Write `contents` to `path` via a sibling temp file and a rename.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), MarksheetError> {
    let failed = |source| MarksheetError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(failed)?;
    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Parse a file of previously extracted gazette text, honouring
/// [`ParseConfig::parse_timeout_secs`].
///
/// On expiry the blocking parse is abandoned and no records are returned.
pub async fn parse_text_file(
    path: impl AsRef<Path>,
    config: &ParseConfig,
) -> Result<ParseReport, MarksheetError> {
    let path = path.as_ref();
    info!("Parsing text {} as {}", path.display(), config.semester);

    let work = async {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::PermissionDenied => MarksheetError::PermissionDenied {
                    path: path.to_path_buf(),
                },
                std::io::ErrorKind::NotFound => MarksheetError::FileNotFound {
                    path: path.to_path_buf(),
                },
                _ => MarksheetError::Internal(format!("failed to read {}: {e}", path.display())),
            })?;
        let config = config.clone();
        tokio::task::spawn_blocking(move || parse_text(&text, &config))
            .await
            .map_err(|e| MarksheetError::Internal(format!("parse task failed: {e}")))
    };

    with_timeout(work, config.parse_timeout_secs).await
}

/// Read and reflow a PDF's text layer without parsing it.
///
/// The returned text has not been through the noise stripper; pass it to
/// [`clean_text`] or [`parse_text`]. Useful for inspecting what a grammar
/// will see when a new gazette yields no records.
pub async fn extract_text(
    input: impl AsRef<str>,
    config: &ParseConfig,
) -> Result<String, MarksheetError> {
    let source = input::resolve_input(input.as_ref(), config.download_timeout_secs).await?;
    let extracted = glyphs::extract_glyph_runs(
        source.path(),
        config.password.as_deref(),
        &config.pages,
        config.progress_callback.clone(),
    )
    .await?;
    Ok(reflow_document(&extracted.pages, &config.reflow))
}

/// Reflow extracted pages and parse the resulting text.
pub fn parse_glyph_pages(pages: &[Vec<PositionedGlyphRun>], config: &ParseConfig) -> ParseReport {
    let text = reflow_document(pages, &config.reflow);
    let mut report = parse_text(&text, config);
    report.stats.pages = pages.len();
    report
}

/// Apply the semester's noise rules (plus any configured extras).
pub fn clean_text(text: &str, config: &ParseConfig) -> String {
    let profile = config.semester.profile();
    let rules: Vec<NoiseRule> = profile
        .noise_rules
        .into_iter()
        .chain(config.extra_noise_rules.iter().cloned())
        .collect();
    strip_noise(text, &rules)
}

/// Parse reflowed document text. Pure: no I/O, no pdfium.
pub fn parse_text(text: &str, config: &ParseConfig) -> ParseReport {
    let started = Instant::now();
    let profile = config.semester.profile();
    let grammar = grammar_for(&profile, config.mode);
    let callback = config.progress_callback.as_ref();

    let cleaned = clean_text(text, config);
    let sections = grammar.segment(&cleaned);
    let apparent_blocks: usize = sections.iter().map(|s| s.blocks.len()).sum();
    debug!(
        "{} sections, {} apparent blocks ({:?})",
        sections.len(),
        apparent_blocks,
        grammar.layout()
    );
    if let Some(cb) = callback {
        cb.on_parse_start(apparent_blocks);
    }

    let mut parsed: Vec<(StudentRecord, &[SubjectSlot])> = Vec::new();
    let mut skipped = Vec::new();

    for section in &sections {
        for block in &section.blocks {
            let outcome = if grammar.has_mark_tokens(block) {
                grammar
                    .extract(block, &section.subjects)
                    .and_then(|raw| assemble::assemble(raw, section.subjects.len()))
            } else {
                Err(SkipReason::NoMarkTokens)
            };

            match outcome {
                Ok(record) => parsed.push((record, section.subjects.as_slice())),
                Err(reason) => {
                    debug!("Block {} skipped: {}", block.index, reason);
                    if let Some(cb) = callback {
                        cb.on_block_skipped(block.index, &reason.to_string());
                    }
                    skipped.push(SkippedBlock {
                        index: block.index,
                        seat_hint: block.seat_hint(),
                        reason,
                    });
                }
            }
        }
    }

    let subjects = if parsed.is_empty() {
        profile.subjects
    } else {
        merge_subjects(parsed.iter().map(|(_, slots)| *slots))
    };
    let records: Vec<StudentRecord> = parsed
        .into_iter()
        .map(|(mut record, slots)| {
            align_subjects(&mut record, slots, &subjects);
            record
        })
        .collect();

    if let Some(cb) = callback {
        cb.on_parse_complete(records.len(), apparent_blocks);
    }

    let stats = ParseStats {
        pages: 0,
        apparent_blocks,
        parsed_records: records.len(),
        skipped_blocks: skipped.len(),
        extraction_duration_ms: 0,
        parse_duration_ms: started.elapsed().as_millis() as u64,
    };

    let report = ParseReport {
        semester: config.semester,
        layout: grammar.layout(),
        subjects,
        records,
        skipped,
        stats,
    };
    info!("{}", report.summary_line());
    report
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn parse_source(path: &Path, config: &ParseConfig) -> Result<ParseReport, MarksheetError> {
    let extraction_started = Instant::now();
    let extracted = glyphs::extract_glyph_runs(
        path,
        config.password.as_deref(),
        &config.pages,
        config.progress_callback.clone(),
    )
    .await?;
    let extraction_duration_ms = extraction_started.elapsed().as_millis() as u64;
    info!(
        "Read {} of {} pages in {}ms",
        extracted.pages.len(),
        extracted.total_pages,
        extraction_duration_ms
    );

    let pages = extracted.pages;
    let worker_config = config.clone();
    let mut report =
        tokio::task::spawn_blocking(move || parse_glyph_pages(&pages, &worker_config))
            .await
            .map_err(|e| MarksheetError::Internal(format!("parse task failed: {e}")))?;
    report.stats.extraction_duration_ms = extraction_duration_ms;
    Ok(report)
}

/// Union of subject lists by paper code, in order of first appearance.
fn merge_subjects<'a>(lists: impl IntoIterator<Item = &'a [SubjectSlot]>) -> Vec<SubjectSlot> {
    let mut merged: Vec<SubjectSlot> = Vec::new();
    for slot in lists.into_iter().flatten() {
        if !merged.iter().any(|m| m.code == slot.code) {
            merged.push(slot.clone());
        }
    }
    merged
}

/// Move a record's tuples from its section's slot order onto `subjects`.
/// Slots the section never printed stay empty.
fn align_subjects(record: &mut StudentRecord, section: &[SubjectSlot], subjects: &[SubjectSlot]) {
    if section == subjects {
        return;
    }
    let mut tuples = std::mem::take(&mut record.subjects);
    record.subjects = subjects
        .iter()
        .map(|slot| {
            section
                .iter()
                .position(|s| s.code == slot.code)
                .and_then(|i| tuples.get_mut(i))
                .map(std::mem::take)
                .unwrap_or_default()
        })
        .collect();
    debug!(
        "Seat {}: {} subjects re-keyed onto {} columns",
        record.seat_no,
        section.len(),
        subjects.len()
    );
}

async fn with_timeout<F>(work: F, secs: Option<u64>) -> Result<ParseReport, MarksheetError>
where
    F: std::future::Future<Output = Result<ParseReport, MarksheetError>>,
{
    match secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), work)
            .await
            .map_err(|_| MarksheetError::Timeout { secs })?,
        None => work.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseMode;
    use crate::output::SubjectTuple;
    use crate::progress::ParseProgressCallback;
    use crate::semester::Semester;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const SEM1_TEXT: &str = "\
University of Mumbai, Mumbai
OFFICE REGISTER FOR THE F.E. EXAMINATION
FEC101 TW-Engineering Mathematics-I Term Work:
1234567 JOHN DOE | 3 A 9 27 | P
TOTAL | 60 20 80 |
----------------------------------------
1234568 /ASHA RANI | 3 B 8 24 | P
TOTAL | 50 20 70 |
1234569 SEAT NUMBER ONLY | P
/ - FEMALE
PAGE NO 1";

    #[derive(Default)]
    struct Counter {
        skipped: AtomicUsize,
        completed: AtomicUsize,
    }

    impl ParseProgressCallback for Counter {
        fn on_block_skipped(&self, _index: usize, _reason: &str) {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }
        fn on_parse_complete(&self, records: usize, _apparent_blocks: usize) {
            self.completed.store(records, Ordering::SeqCst);
        }
    }

    #[test]
    fn text_parse_keeps_valid_blocks_and_reports_skips() {
        let counter = Arc::new(Counter::default());
        let config = ParseConfig::builder(Semester::I)
            .progress_callback(counter.clone())
            .build()
            .unwrap();
        let report = parse_text(SEM1_TEXT, &config);

        assert_eq!(report.stats.apparent_blocks, 3);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].subjects[0].marks, Some(80));
        assert_eq!(report.records[1].name, "ASHA RANI");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::NoMarkTokens);
        assert_eq!(report.skipped[0].seat_hint.as_deref(), Some("1234569"));
        assert_eq!(report.subjects.len(), 6);
        assert_eq!(counter.skipped.load(Ordering::SeqCst), 1);
        assert_eq!(counter.completed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn text_without_anchors_is_empty_not_error() {
        let config = ParseConfig::new(Semester::III);
        let report = parse_text("University of Mumbai, Mumbai\nnothing here", &config);
        assert!(report.is_empty());
        assert_eq!(report.stats.apparent_blocks, 0);
        assert_eq!(report.subjects, Semester::III.profile().subjects);
    }

    #[test]
    fn summary_mode_fills_identity_only() {
        let config = ParseConfig::builder(Semester::I)
            .mode(ParseMode::Summary)
            .build()
            .unwrap();
        let text = "1234567 JOHN DOE PRN: 2021016400123 SGPI: 7.25 PASS";
        let report = parse_text(text, &config);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].result, "PASS");
        assert!(report.records[0].subjects.iter().all(|t| t.is_empty()));
    }

    #[test]
    fn extra_noise_rules_apply() {
        let config = ParseConfig::builder(Semester::I)
            .noise_rule(NoiseRule::line("WATERMARK"))
            .build()
            .unwrap();
        assert_eq!(clean_text("a\nWATERMARK copy\nb", &config), "a\nb");
    }

    #[test]
    fn glyph_pages_are_reflowed_first() {
        let config = ParseConfig::new(Semester::I);
        let page = vec![
            PositionedGlyphRun::new("| 3 A 9 27 | P", 120.0, 700.0, 80.0),
            PositionedGlyphRun::new("1234567", 10.0, 700.0, 40.0),
            PositionedGlyphRun::new("JOHN DOE", 60.0, 701.0, 50.0),
        ];
        let report = parse_glyph_pages(&[page], &config);
        assert_eq!(report.stats.pages, 1);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].name, "JOHN DOE");
    }

    #[test]
    fn later_legend_subjects_are_appended_by_code() {
        let first = vec![SubjectSlot::new("A1", "Alpha"), SubjectSlot::new("B1", "Beta")];
        let second = vec![
            SubjectSlot::new("B1", "Beta"),
            SubjectSlot::new("C1", "Gamma"),
            SubjectSlot::new("A1", "Alpha"),
        ];
        let merged = merge_subjects([first.as_slice(), second.as_slice()]);
        let codes: Vec<&str> = merged.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, ["A1", "B1", "C1"]);

        let report = parse_text(
            "1234567 JOHN DOE PRN: 2021016400123 SGPI: 7.25 PASS",
            &ParseConfig::builder(Semester::I)
                .mode(ParseMode::Summary)
                .build()
                .unwrap(),
        );
        let mut record = report.records[0].clone();
        record.subjects = vec![
            SubjectTuple {
                marks: Some(40),
                ..Default::default()
            },
            SubjectTuple::default(),
            SubjectTuple {
                marks: Some(70),
                ..Default::default()
            },
        ];
        align_subjects(&mut record, &second, &merged);
        let marks: Vec<Option<u32>> = record.subjects.iter().map(|t| t.marks).collect();
        assert_eq!(marks, [Some(70), Some(40), None]);
    }

    #[tokio::test]
    async fn missing_input_is_fatal() {
        let config = ParseConfig::new(Semester::V);
        let err = parse_pdf("/no/such/gazette.pdf", &config).await.unwrap_err();
        assert!(matches!(err, MarksheetError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn timeout_yields_no_partial_result() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(parse_text("", &ParseConfig::new(Semester::I)))
        };
        let err = with_timeout(slow, Some(1)).await.unwrap_err();
        assert!(matches!(err, MarksheetError::Timeout { secs: 1 }));
    }

    #[tokio::test]
    async fn text_file_parses_like_in_memory_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sem1.txt");
        std::fs::write(&path, SEM1_TEXT).unwrap();
        let config = ParseConfig::builder(Semester::I)
            .parse_timeout_secs(30)
            .build()
            .unwrap();

        let from_file = parse_text_file(&path, &config).await.unwrap();
        let in_memory = parse_text(SEM1_TEXT, &config);
        assert_eq!(from_file.records, in_memory.records);
        assert_eq!(from_file.skipped, in_memory.skipped);
    }

    #[tokio::test]
    async fn missing_text_file_is_fatal() {
        let config = ParseConfig::builder(Semester::I)
            .parse_timeout_secs(30)
            .build()
            .unwrap();
        let err = parse_text_file("/no/such/sem1.txt", &config)
            .await
            .unwrap_err();
        assert!(matches!(err, MarksheetError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn atomic_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/sem1.csv");
        write_atomic(&path, b"a,b\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");
        assert!(!dir.path().join("out/sem1.csv.tmp").exists());
    }
}

//! # marksheet-parser
//!
//! Reconstruct per-student academic records from University of Mumbai
//! result-gazette PDFs and export them as CSV or JSON.
//!
//! Gazettes are printed by a report generator that paints every field as an
//! independently positioned text run. Plain `pdftotext` output therefore
//! loses both reading order and column structure. This crate rebuilds lines
//! from glyph geometry, strips the repeating page boilerplate, and applies a
//! per-semester record grammar to each student block.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve local file, URL download or in-memory bytes
//!  ├─ 2. Glyphs   positioned text runs via pdfium (spawn_blocking)
//!  ├─ 3. Reflow   group runs into lines by y, order by x
//!  ├─ 4. Noise    drop banner / legend / footer blocks
//!  ├─ 5. Segment  split on the layout's seat-number anchor
//!  ├─ 6. Grammar  extract fields per block (one grammar per layout)
//!  └─ 7. Assemble validate, pad subjects, total credits → ParseReport
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use marksheet_parser::{parse_pdf, to_csv, ParseConfig, Semester};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ParseConfig::builder(Semester::V).build()?;
//!     let report = parse_pdf("gazette.pdf", &config).await?;
//!     eprintln!("{}", report.summary_line());
//!     print!("{}", to_csv(&report)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `marksheet2csv` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## Supported semesters
//!
//! | Semester | Layout |
//! |----------|--------|
//! | I, II    | pipe-separated subject columns with a totals line |
//! | III, IV  | `Marks … Grade …` run with optional subject legends |
//! | V, VI    | paper-code rows at fixed line offsets |
//!
//! Any semester can also be parsed in [`ParseMode::Summary`], which keeps
//! identity and outcome only.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod csv;
pub mod error;
pub mod grammar;
pub mod output;
pub mod parse;
pub mod pipeline;
pub mod progress;
pub mod semester;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageSelection, ParseConfig, ParseConfigBuilder, ParseMode};
pub use csv::{formula_escape, to_csv, unescape_formula, write_csv};
pub use error::{MarksheetError, SkipReason};
pub use grammar::{grammar_for, RawRecord, SemesterGrammar};
pub use output::{Gender, ParseReport, ParseStats, SkippedBlock, StudentRecord, SubjectTuple};
pub use parse::{
    clean_text, extract_text, parse_glyph_pages, parse_pdf, parse_pdf_bytes, parse_pdf_sync,
    parse_text, parse_text_file, parse_to_csv_file, write_atomic,
};
pub use pipeline::noise::NoiseRule;
pub use pipeline::reflow::{GapSeparator, PositionedGlyphRun, ReflowOptions};
pub use progress::{NoopProgressCallback, ParseProgressCallback, ProgressCallback};
pub use semester::{Layout, Semester, SemesterProfile, SubjectSlot};

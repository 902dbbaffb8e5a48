//! Pipeline stages for gazette parsing.
//!
//! Each submodule implements one transformation step and is testable on its
//! own. Only [`input`] and [`glyphs`] touch the file system or pdfium; the
//! rest are pure functions over text.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ glyphs ──▶ reflow ──▶ noise ──▶ segment ──▶ (grammar) ──▶ assemble
//! (path/URL) (pdfium)   (lines)   (strip)   (blocks)                  (records)
//! ```
//!
//! 1. [`input`]    canonicalise the path, URL or byte buffer to a local PDF
//! 2. [`glyphs`]   read positioned text runs per page in `spawn_blocking`
//! 3. [`reflow`]   rebuild reading-order lines from run geometry
//! 4. [`noise`]    remove marker-delimited page boilerplate
//! 5. [`segment`]  split text into one block per seat-number anchor
//! 6. [`assemble`] validate extracted fields and build the final record

pub mod assemble;
pub mod glyphs;
pub mod input;
pub mod noise;
pub mod reflow;
pub mod segment;

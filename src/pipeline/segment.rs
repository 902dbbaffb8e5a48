//! Block segmentation: split cleaned text into one chunk per student.
//!
//! The `regex` crate has no look-ahead, so the zero-width split is done by
//! hand: every anchor match start becomes a cut point, and each chunk runs
//! from its cut point to the next one (or to end-of-input). The anchor text
//! therefore stays at the head of its chunk.
//!
//! Anything before the first anchor is returned separately as the preamble;
//! it is never a student.

use regex::Regex;
use tracing::debug;

/// A contiguous run of lines belonging to one student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentBlock {
    /// 0-based position of the block in the document.
    pub index: usize,
    pub text: String,
}

impl StudentBlock {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Non-blank lines, excluding dash separators left by the noise stripper.
    pub fn content_lines(&self) -> Vec<&str> {
        self.text
            .lines()
            .filter(|l| !l.trim().is_empty() && !super::noise::is_separator_line(l))
            .collect()
    }

    /// The leading digit run of the first line, if any.
    pub fn seat_hint(&self) -> Option<String> {
        let digits: String = self
            .text
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        (!digits.is_empty()).then_some(digits)
    }
}

/// Result of splitting a text on an anchor.
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    /// Text before the first anchor (trimmed).
    pub preamble: String,
    pub blocks: Vec<StudentBlock>,
}

/// Split `text` at every match of `anchor`, keeping the anchor in its chunk.
///
/// `anchor` should be a multi-line pattern (`(?m)^…`). Block indices start
/// at `first_index` so callers segmenting several sections can keep a
/// document-wide numbering.
pub fn split_blocks(text: &str, anchor: &Regex, first_index: usize) -> Segmentation {
    let starts: Vec<usize> = anchor
        .find_iter(text)
        .map(|m| m.start())
        .filter(|&s| s < text.len())
        .collect();

    let Some(&first) = starts.first() else {
        return Segmentation {
            preamble: text.trim().to_string(),
            blocks: Vec::new(),
        };
    };

    let blocks: Vec<StudentBlock> = starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            StudentBlock::new(first_index + i, text[start..end].trim_end())
        })
        .collect();

    debug!("Segmented {} blocks", blocks.len());

    Segmentation {
        preamble: text[..first].trim().to_string(),
        blocks,
    }
}

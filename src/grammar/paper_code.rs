//! Third-year layout: paper-code rows at fixed line offsets.
//!
//! ```text
//! 0  1234567 /JANE DOE   PRN: 2019016400123                     P
//! 1  CSC501   | CSC502   | CSC503   | CSC504   | CSDL501  | CSL501
//! 2  3 A 9 27 | 3 B 8 24 | 3 O 10 30| 3 C 7 21 | 3 A 9 27 | 1 O 10 10
//! 3  65       | 58       | 80       | 49       | 66       | 23
//! 4  CSL502   | CSL503   | CSL504   | CSM501
//! 5  1 A 9 9  | 1 B 8 8  | 2 A 9 18 | 2 O 10 20
//! 6  22       | 20       | 41       | 45
//! 7  SGPI: 8.52  CGPI: 8.10  GRADE: A  MOTHER: MARY  REMARK: Successful
//! ```
//!
//! Codes appear in the order the student sat the papers, not master order.
//! Each column is re-indexed through the master code list; codes outside
//! it are dropped with a debug log.

use super::tokens::{first_label_offset, has_tuple, last_integer, parse_tuple, LabelledFields};
use super::{RawRecord, SemesterGrammar};
use crate::error::SkipReason;
use crate::output::SubjectTuple;
use crate::pipeline::segment::StudentBlock;
use crate::semester::{Layout, SubjectSlot};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static ANCHOR: Lazy<Regex> = Lazy::new(|| Regex::new(Layout::PaperCode.anchor()).unwrap());

static RE_PAPER_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2,5}\d{3,5}$").unwrap());

/// Line offsets of each row inside a paper-code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaperCodeOffsets {
    pub info: usize,
    pub top_codes: usize,
    pub top_tuples: usize,
    pub top_marks: usize,
    pub bottom_codes: usize,
    pub bottom_tuples: usize,
    pub bottom_marks: usize,
    pub top_capacity: usize,
    pub bottom_capacity: usize,
}

impl PaperCodeOffsets {
    /// Lines needed for the identity line plus the top group.
    pub fn min_lines(&self) -> usize {
        self.top_marks + 1
    }
}

pub const PAPER_CODE_OFFSETS: PaperCodeOffsets = PaperCodeOffsets {
    info: 0,
    top_codes: 1,
    top_tuples: 2,
    top_marks: 3,
    bottom_codes: 4,
    bottom_tuples: 5,
    bottom_marks: 6,
    top_capacity: 6,
    bottom_capacity: 4,
};

#[derive(Debug, Clone)]
pub struct PaperCodeGrammar {
    subjects: Vec<SubjectSlot>,
    offsets: PaperCodeOffsets,
}

impl PaperCodeGrammar {
    pub fn new(subjects: Vec<SubjectSlot>) -> Self {
        Self {
            subjects,
            offsets: PAPER_CODE_OFFSETS,
        }
    }

    /// Read one codes/tuples/marks row group into `out`, keyed by code.
    fn read_group(
        &self,
        lines: &[&str],
        rows: (usize, usize, usize),
        capacity: usize,
        subjects: &[SubjectSlot],
        out: &mut [SubjectTuple],
    ) {
        let (codes_at, tuples_at, marks_at) = rows;
        let Some(codes) = lines.get(codes_at).and_then(|l| code_row(l)) else {
            return;
        };
        if codes.len() > capacity {
            debug!(
                "Code row has {} codes, reading the first {}",
                codes.len(),
                capacity
            );
        }

        let tuples: Vec<&str> = lines
            .get(tuples_at)
            .map(|l| l.split('|').collect())
            .unwrap_or_default();
        let marks: Vec<&str> = lines
            .get(marks_at)
            .map(|l| l.split('|').collect())
            .unwrap_or_default();

        for (column, code) in codes.iter().take(capacity).enumerate() {
            let Some(slot) = subjects.iter().position(|s| s.code == *code) else {
                debug!("Paper code {} is not in the subject list; ignored", code);
                continue;
            };
            if !out[slot].is_empty() {
                debug!("Paper code {} repeated; keeping the first column", code);
                continue;
            }

            let mut tuple = tuples
                .get(column)
                .and_then(|seg| parse_tuple(seg))
                .unwrap_or_default();
            tuple.marks = marks.get(column).and_then(|seg| last_integer(seg));
            out[slot] = tuple;
        }
    }
}

impl SemesterGrammar for PaperCodeGrammar {
    fn layout(&self) -> Layout {
        Layout::PaperCode
    }

    fn anchor(&self) -> &Regex {
        &ANCHOR
    }

    fn default_subjects(&self) -> &[SubjectSlot] {
        &self.subjects
    }

    fn has_mark_tokens(&self, block: &StudentBlock) -> bool {
        has_tuple(&block.text)
    }

    fn extract(
        &self,
        block: &StudentBlock,
        subjects: &[SubjectSlot],
    ) -> Result<RawRecord, SkipReason> {
        let o = &self.offsets;
        let lines = block.content_lines();
        if lines.len() < o.min_lines() {
            return Err(SkipReason::TooFewLines {
                found: lines.len(),
                required: o.min_lines(),
            });
        }

        let (seat_no, raw_name, result) = parse_info_line(lines[o.info])?;

        if code_row(lines[o.top_codes]).is_none() {
            return Err(SkipReason::ShapeMismatch {
                detail: "second line is not a paper-code row".into(),
            });
        }

        let mut tuples = vec![SubjectTuple::default(); subjects.len()];
        self.read_group(
            &lines,
            (o.top_codes, o.top_tuples, o.top_marks),
            o.top_capacity,
            subjects,
            &mut tuples,
        );
        self.read_group(
            &lines,
            (o.bottom_codes, o.bottom_tuples, o.bottom_marks),
            o.bottom_capacity,
            subjects,
            &mut tuples,
        );

        let labelled = LabelledFields::scan(&block.text);

        Ok(RawRecord {
            seat_no,
            raw_name,
            mother_name: labelled.mother_name,
            prn: labelled.prn,
            result,
            subjects: tuples,
            sgpi: labelled.sgpi,
            cgpi: labelled.cgpi,
            final_grade: labelled.final_grade,
            remark: labelled.remark,
        })
    }
}

/// `seat name [PRN: x] result` → (seat, name, result).
fn parse_info_line(line: &str) -> Result<(String, String, String), SkipReason> {
    let trimmed = line.trim();
    let seat_end = trimmed
        .find(char::is_whitespace)
        .unwrap_or(trimmed.len());
    let seat = &trimmed[..seat_end];
    if seat.is_empty() || !seat.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SkipReason::ShapeMismatch {
            detail: "info line does not start with a seat number".into(),
        });
    }

    let rest = trimmed[seat_end..].trim_start();
    let result_start = rest.rfind(char::is_whitespace).map_or(0, |i| i + 1);
    let result = &rest[result_start..];
    let middle = &rest[..result_start];
    let name = &middle[..first_label_offset(middle).unwrap_or(middle.len())];

    Ok((seat.to_string(), name.trim().to_string(), result.to_string()))
}

/// Codes of a `CODE | CODE | …` row, or `None` if any cell is not a code.
fn code_row(line: &str) -> Option<Vec<&str>> {
    let codes: Vec<&str> = line
        .split('|')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    (!codes.is_empty() && codes.iter().all(|c| RE_PAPER_CODE.is_match(c))).then_some(codes)
}

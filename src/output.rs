//! Canonical output types: student records and the per-document report.

use crate::error::SkipReason;
use crate::semester::{Layout, Semester, SubjectSlot};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gender as marked in the gazette: a `/` before the name means female.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("Male"),
            Gender::Female => f.write_str("Female"),
        }
    }
}

/// One subject's figures. `None` means "not found in the block", which is
/// never the same thing as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectTuple {
    pub credits: Option<f64>,
    pub grade: Option<char>,
    pub grade_points: Option<f64>,
    /// Credits × grade points.
    pub credit_points: Option<f64>,
    pub marks: Option<u32>,
}

impl SubjectTuple {
    /// `true` when no field was located.
    pub fn is_empty(&self) -> bool {
        self.credits.is_none()
            && self.grade.is_none()
            && self.grade_points.is_none()
            && self.credit_points.is_none()
            && self.marks.is_none()
    }
}

/// A fully assembled, validated student record.
///
/// `seat_no`, `name` and `result` are guaranteed non-empty and trimmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub seat_no: String,
    pub name: String,
    pub gender: Gender,
    pub mother_name: Option<String>,
    pub prn: Option<String>,
    /// Result token as printed: `P`, `F`, `Successful`, `PASS`, …
    pub result: String,
    /// Exactly one tuple per subject slot, in slot order.
    pub subjects: Vec<SubjectTuple>,
    pub total_credits: f64,
    pub total_credit_points: f64,
    pub sgpi: Option<f64>,
    pub cgpi: Option<f64>,
    pub final_grade: Option<String>,
    pub remark: Option<String>,
}

/// A block that produced no record, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedBlock {
    pub index: usize,
    /// Leading digits of the block, when present.
    pub seat_hint: Option<String>,
    pub reason: SkipReason,
}

/// Counters for one parse call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseStats {
    /// Pages whose text layer was read (0 for text input).
    pub pages: usize,
    /// Anchor matches found by the segmenter.
    pub apparent_blocks: usize,
    pub parsed_records: usize,
    pub skipped_blocks: usize,
    pub extraction_duration_ms: u64,
    pub parse_duration_ms: u64,
}

/// Everything one document produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseReport {
    pub semester: Semester,
    pub layout: Layout,
    /// Subject slots matching each record's `subjects`. For legend-driven
    /// layouts this is every legend's list merged by paper code, in order of
    /// first appearance; records are re-keyed onto it.
    pub subjects: Vec<SubjectSlot>,
    pub records: Vec<StudentRecord>,
    pub skipped: Vec<SkippedBlock>,
    pub stats: ParseStats,
}

impl ParseReport {
    /// `true` when the document was readable but nothing matched.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Human-readable outcome, e.g. `parsed 40 of 42 apparent records`.
    pub fn summary_line(&self) -> String {
        if self.records.is_empty() {
            format!(
                "no records found ({} apparent blocks); check the semester template",
                self.stats.apparent_blocks
            )
        } else {
            format!(
                "parsed {} of {} apparent records",
                self.records.len(),
                self.stats.apparent_blocks
            )
        }
    }
}

//! Summary layout: labelled tokens on whitespace-separated lines.
//!
//! Used for every semester in summary mode, where only identity and the
//! overall outcome are wanted. Each line of a block is scanned for a seat
//! number, `PRN`, `SGPI`, a `PASS`/`FAIL` token and the first all-caps run
//! long enough to be a name. Subject tuples are left empty.

use super::tokens::{parse_decimal, LabelledFields};
use super::{RawRecord, SemesterGrammar};
use crate::error::SkipReason;
use crate::output::SubjectTuple;
use crate::pipeline::segment::StudentBlock;
use crate::semester::{Layout, SubjectSlot};
use once_cell::sync::Lazy;
use regex::Regex;

static ANCHOR: Lazy<Regex> = Lazy::new(|| Regex::new(Layout::WhitespaceRun.anchor()).unwrap());

static RE_SEAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d{7})\b").unwrap());
static RE_OUTCOME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(PASS|FAIL)(?:ES|ED)?\b").unwrap());
static RE_SUMMARY_SGPI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bSGP[IA]\s*[:.]?\s*(\d+(?:\.\d+)?)").unwrap());
/// Spans removed before looking for the name: labels with their values.
static RE_LABELLED_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:PRN\s*[:.]?\s*\(?[A-Z0-9]{8,20}\)?|[SC]GP[IA]\s*[:.]?\s*\d+(?:\.\d+)?|RESULT\s*[:.]?|PASS(?:ES|ED)?\b|FAIL(?:ED)?\b)",
    )
    .unwrap()
});
static RE_CAPS_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/?\b[A-Z]+\b(?:[ \t]+[A-Z]+\b)*").unwrap());

/// Letters an all-caps run needs before it is taken as a name.
const MIN_NAME_LETTERS: usize = 5;

#[derive(Debug, Clone)]
pub struct WhitespaceRunGrammar {
    subjects: Vec<SubjectSlot>,
}

impl WhitespaceRunGrammar {
    pub fn new(subjects: Vec<SubjectSlot>) -> Self {
        Self { subjects }
    }
}

impl SemesterGrammar for WhitespaceRunGrammar {
    fn layout(&self) -> Layout {
        Layout::WhitespaceRun
    }

    fn anchor(&self) -> &Regex {
        &ANCHOR
    }

    fn default_subjects(&self) -> &[SubjectSlot] {
        &self.subjects
    }

    fn has_mark_tokens(&self, block: &StudentBlock) -> bool {
        RE_OUTCOME.is_match(&block.text) || RE_SUMMARY_SGPI.is_match(&block.text)
    }

    fn extract(
        &self,
        block: &StudentBlock,
        subjects: &[SubjectSlot],
    ) -> Result<RawRecord, SkipReason> {
        let mut seat_no = None;
        let mut raw_name = None;
        let mut result = None;
        let mut sgpi = None;

        for line in block.content_lines() {
            let mut residue = line.to_string();
            if seat_no.is_none() {
                if let Some(c) = RE_SEAT.captures(line) {
                    seat_no = Some(c[1].to_string());
                    residue = line[c.get(0).map_or(0, |m| m.end())..].to_string();
                }
            }
            if result.is_none() {
                result = RE_OUTCOME.captures(line).map(|c| c[1].to_string());
            }
            if sgpi.is_none() {
                sgpi = RE_SUMMARY_SGPI
                    .captures(line)
                    .and_then(|c| parse_decimal(&c[1]));
            }
            if raw_name.is_none() {
                raw_name = find_name(&residue);
            }
        }

        let seat_no = seat_no.ok_or_else(|| SkipReason::ShapeMismatch {
            detail: "no seat number".into(),
        })?;
        let labelled = LabelledFields::scan(&block.text);

        Ok(RawRecord {
            seat_no,
            raw_name: raw_name.unwrap_or_default(),
            mother_name: labelled.mother_name,
            prn: labelled.prn,
            result: result.unwrap_or_default(),
            subjects: vec![SubjectTuple::default(); subjects.len()],
            sgpi: sgpi.or(labelled.sgpi),
            cgpi: labelled.cgpi,
            final_grade: labelled.final_grade,
            remark: labelled.remark,
        })
    }
}

/// First all-caps run with at least [`MIN_NAME_LETTERS`] letters, after
/// labelled fields are blanked out.
fn find_name(line: &str) -> Option<String> {
    let residue = RE_LABELLED_SPAN.replace_all(line, " ");
    RE_CAPS_RUN
        .find_iter(&residue)
        .map(|m| m.as_str().trim())
        .find(|run| run.chars().filter(char::is_ascii_alphabetic).count() >= MIN_NAME_LETTERS)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semester::Semester;

    fn grammar() -> WhitespaceRunGrammar {
        WhitespaceRunGrammar::new(Semester::II.profile().subjects)
    }

    #[test]
    fn summary_line_fields() {
        let g = grammar();
        let block = StudentBlock::new(0, "1234567 /JANE DOE PRN: 2021016400123 SGPI: 8.25 PASS");
        assert!(g.has_mark_tokens(&block));
        let raw = g.extract(&block, g.default_subjects()).unwrap();
        assert_eq!(raw.seat_no, "1234567");
        assert_eq!(raw.raw_name, "/JANE DOE");
        assert_eq!(raw.prn.as_deref(), Some("2021016400123"));
        assert_eq!(raw.sgpi, Some(8.25));
        assert_eq!(raw.result, "PASS");
        assert_eq!(raw.subjects.len(), 7);
        assert!(raw.subjects.iter().all(SubjectTuple::is_empty));
    }

    #[test]
    fn fields_spread_across_lines() {
        let g = grammar();
        let text = "1234567  45 38 60\n   RAVI KUMAR  Marks 52\nSGPI 6.10   FAIL";
        let raw = g.extract(&StudentBlock::new(0, text), g.default_subjects()).unwrap();
        assert_eq!(raw.raw_name, "RAVI KUMAR");
        assert_eq!(raw.result, "FAIL");
        assert_eq!(raw.sgpi, Some(6.1));
    }

    #[test]
    fn short_caps_runs_are_not_names() {
        assert_eq!(find_name(" CSC 45 AB"), None);
        assert_eq!(find_name(" A B C D E"), Some("A B C D E".to_string()));
        assert_eq!(find_name(" PRN: 2021016400123 ASHA RANI"), Some("ASHA RANI".to_string()));
    }

    #[test]
    fn block_without_outcome_has_no_mark_tokens() {
        let g = grammar();
        assert!(!g.has_mark_tokens(&StudentBlock::new(0, "1234567 SEAT NUMBER")));
    }
}

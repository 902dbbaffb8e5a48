//! First-year layout: `|`-separated subject columns.
//!
//! ```text
//! 1234567 /JANE DOE       | 3 A 9 27 | 2 B 8 16 | ... | P  SGPI: 8.52
//!                         | 1 O 10 10 |          | ...
//! TOTAL                   | 40+ 35 75 | 30 28 58 | ...
//! MOTHER: MARY   PRN: 2021016400123
//! ```
//!
//! The info line carries identity, one tuple segment per subject and the
//! result after the last `|`. A segment without a tuple may have it on a
//! continuation line (same column index). Marks come from the totals line:
//! the last integer of the same column.

use super::tokens::{first_label_offset, has_tuple, last_integer, parse_tuple, LabelledFields};
use super::{RawRecord, SemesterGrammar};
use crate::error::SkipReason;
use crate::pipeline::segment::StudentBlock;
use crate::semester::{Layout, SubjectSlot};
use once_cell::sync::Lazy;
use regex::Regex;

static ANCHOR: Lazy<Regex> = Lazy::new(|| Regex::new(Layout::PipeColumn.anchor()).unwrap());

static RE_IDENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d{5,10})\s+(.*)$").unwrap());

#[derive(Debug, Clone)]
pub struct PipeColumnGrammar {
    subjects: Vec<SubjectSlot>,
}

impl PipeColumnGrammar {
    pub fn new(subjects: Vec<SubjectSlot>) -> Self {
        Self { subjects }
    }
}

impl SemesterGrammar for PipeColumnGrammar {
    fn layout(&self) -> Layout {
        Layout::PipeColumn
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
        let lines = block.content_lines();
        let Some((info, rest)) = lines.split_first() else {
            return Err(SkipReason::TooFewLines {
                found: 0,
                required: 1,
            });
        };

        let columns: Vec<&str> = info.split('|').collect();
        if columns.len() < 2 {
            return Err(SkipReason::ShapeMismatch {
                detail: "info line has no column separators".into(),
            });
        }

        let identity = RE_IDENTITY
            .captures(columns[0])
            .ok_or_else(|| SkipReason::ShapeMismatch {
                detail: "info line does not start with a seat number".into(),
            })?;
        let seat_no = identity[1].to_string();
        let name_span = &identity[2];
        let raw_name = name_span[..first_label_offset(name_span).unwrap_or(name_span.len())]
            .trim()
            .to_string();

        let result = columns
            .last()
            .and_then(|tail| tail.split_whitespace().next())
            .unwrap_or_default()
            .to_string();

        let pipe_lines: Vec<&str> = rest.iter().copied().filter(|l| l.contains('|')).collect();
        let totals = pipe_lines
            .iter()
            .position(|l| is_totals_line(l))
            .or_else(|| {
                // An unlabelled totals line carries marks only, never a tuple.
                pipe_lines
                    .len()
                    .checked_sub(1)
                    .filter(|&last| !has_tuple(pipe_lines[last]))
            });
        let continuations: Vec<&str> = pipe_lines
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != totals)
            .map(|(_, l)| *l)
            .collect();
        let totals_line = totals.map(|i| pipe_lines[i]);

        // Subject columns sit between the identity column and the tail.
        let segments = &columns[1..columns.len() - 1];

        let tuples = (0..subjects.len())
            .map(|i| {
                let mut tuple = segments
                    .get(i)
                    .and_then(|seg| parse_tuple(seg))
                    .or_else(|| {
                        continuations
                            .iter()
                            .find_map(|line| line.split('|').nth(i + 1).and_then(parse_tuple))
                    })
                    .unwrap_or_default();
                tuple.marks = totals_line
                    .and_then(|line| line.split('|').nth(i + 1))
                    .and_then(last_integer);
                tuple
            })
            .collect();

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

fn is_totals_line(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|first| first.to_ascii_uppercase().starts_with("TOT"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar(n: usize) -> PipeColumnGrammar {
        PipeColumnGrammar::new(
            (0..n)
                .map(|i| SubjectSlot::new(format!("FEC10{}", i + 1), format!("S{}", i + 1)))
                .collect(),
        )
    }

    #[test]
    fn single_subject_info_line() {
        let g = grammar(1);
        let block = StudentBlock::new(0, "1234567 JOHN DOE |80 A 8 32| Successful");
        assert!(g.has_mark_tokens(&block));
        let raw = g.extract(&block, g.default_subjects()).unwrap();
        assert_eq!(raw.seat_no, "1234567");
        assert_eq!(raw.raw_name, "JOHN DOE");
        assert_eq!(raw.result, "Successful");
        let t = &raw.subjects[0];
        assert_eq!(t.credits, Some(80.0));
        assert_eq!(t.grade, Some('A'));
        assert_eq!(t.grade_points, Some(8.0));
        assert_eq!(t.credit_points, Some(32.0));
        assert_eq!(t.marks, None);
    }

    #[test]
    fn continuation_and_totals_lines() {
        let g = grammar(3);
        let text = "\
1234567 /JANE DOE | 3 A 9 27 |          | 2 C 6 12 | P SGPI: 7.62
                  |          | 1 O 10 10 |          |
TOTAL             | 40+ 35 75 | 20 25 45 | AB       |
MOTHER: MARY PRN: 2021016400123";
        let raw = g.extract(&StudentBlock::new(3, text), g.default_subjects()).unwrap();

        assert_eq!(raw.raw_name, "/JANE DOE");
        assert_eq!(raw.result, "P");
        assert_eq!(raw.subjects[0].marks, Some(75));
        assert_eq!(raw.subjects[1].grade, Some('O'));
        assert_eq!(raw.subjects[1].credits, Some(1.0));
        assert_eq!(raw.subjects[1].marks, Some(45));
        assert_eq!(raw.subjects[2].grade_points, Some(6.0));
        assert_eq!(raw.subjects[2].marks, None);
        assert_eq!(raw.sgpi, Some(7.62));
        assert_eq!(raw.prn.as_deref(), Some("2021016400123"));
        assert_eq!(raw.mother_name.as_deref(), Some("MARY"));
    }

    #[test]
    fn last_pipe_line_is_totals_without_label() {
        let g = grammar(1);
        let text = "1234567 JOHN DOE | 3 A 9 27 | P\n        | 55 30 85 |";
        let raw = g.extract(&StudentBlock::new(0, text), g.default_subjects()).unwrap();
        assert_eq!(raw.subjects[0].marks, Some(85));
        assert_eq!(raw.subjects[0].grade, Some('A'));
    }

    #[test]
    fn unlabelled_continuation_is_not_mistaken_for_totals() {
        let g = grammar(2);
        let text = "\
1234567 JOHN DOE | 3 A 9 27 |           | P
                 |          | 1 O 10 10 |";
        let raw = g.extract(&StudentBlock::new(0, text), g.default_subjects()).unwrap();
        assert_eq!(raw.subjects[0].grade, Some('A'));
        assert_eq!(raw.subjects[1].credits, Some(1.0));
        assert_eq!(raw.subjects[1].grade, Some('O'));
        assert_eq!(raw.subjects[1].credit_points, Some(10.0));
        assert_eq!(raw.subjects[1].marks, None);
    }

    #[test]
    fn missing_columns_are_empty_tuples() {
        let g = grammar(4);
        let raw = g
            .extract(
                &StudentBlock::new(0, "1234567 JOHN DOE | 3 A 9 27 | P"),
                g.default_subjects(),
            )
            .unwrap();
        assert_eq!(raw.subjects.len(), 4);
        assert!(raw.subjects[1..].iter().all(|t| t.is_empty()));
    }

    #[test]
    fn info_line_without_pipes_is_shape_mismatch() {
        let g = grammar(1);
        let err = g
            .extract(&StudentBlock::new(0, "1234567 JOHN DOE 3 A 9 27 P"), g.default_subjects())
            .unwrap_err();
        assert!(matches!(err, SkipReason::ShapeMismatch { .. }));
    }

    #[test]
    fn header_leftover_has_no_mark_tokens() {
        let g = grammar(1);
        assert!(!g.has_mark_tokens(&StudentBlock::new(0, "1234567 SEAT NO NAME | CREDITS | RESULT")));
    }
}

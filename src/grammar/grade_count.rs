//! Second-year layout: a `Marks … Grade …` run per student.
//!
//! ```text
//! SUBJECTS: CSC301 Engineering Mathematics-III | CSC302 Discrete Structures | ...
//! 1234567 Marks 45 38 60 52 41 Grade O A B C P /JANE DOE
//!         C- 3 3 3 3 3 GP- 10 9 8 7 4 GPC- 30 27 24 21 12 7.60 P
//! ```
//!
//! With N active subjects, the block is flattened to one line and matched
//! against `seat Marks <N tokens> Grade <rest>`. Grades are the first N
//! grade tokens of the rest; the name follows the Nth and runs until the
//! first credit-list marker or the trailing `<sgpa> <P|F>` pair.
//!
//! `SUBJECTS:` legend lines replace the active subject list for every block
//! after them, so [`GradeCountGrammar::segment`] emits one section per legend.

use super::tokens::{clean_name, grade_letter, parse_decimal, parse_marks, LabelledFields};
use super::{RawRecord, SemesterGrammar, Section};
use crate::error::SkipReason;
use crate::output::SubjectTuple;
use crate::pipeline::noise::normalise;
use crate::pipeline::segment::{split_blocks, StudentBlock};
use crate::semester::{Layout, SubjectSlot};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static ANCHOR: Lazy<Regex> = Lazy::new(|| Regex::new(Layout::GradeCount.anchor()).unwrap());

static RE_LEGEND: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*SUBJECTS?[ \t]*:[ \t]*(.+)$").unwrap());
static RE_LEGEND_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]{2,5}\d{3,5})\s+(.+)$").unwrap());
static RE_MARKS_PRESENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"Marks\s+\S*\d").unwrap());
static RE_NAME_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\sC-|\bGPC\b|\bGP\b|\bTOT(?:AL)?\b").unwrap());
static RE_SGPA_RESULT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s+([PF])\s*$").unwrap());

/// Grade-column placeholders for subjects without a grade.
const GRADE_PLACEHOLDERS: &[&str] = &["-", "--", "AB", "ABS", "*"];

#[derive(Debug, Clone)]
pub struct GradeCountGrammar {
    subjects: Vec<SubjectSlot>,
}

impl GradeCountGrammar {
    pub fn new(subjects: Vec<SubjectSlot>) -> Self {
        Self { subjects }
    }
}

impl SemesterGrammar for GradeCountGrammar {
    fn layout(&self) -> Layout {
        Layout::GradeCount
    }

    fn anchor(&self) -> &Regex {
        &ANCHOR
    }

    fn default_subjects(&self) -> &[SubjectSlot] {
        &self.subjects
    }

    fn segment(&self, text: &str) -> Vec<Section> {
        let mut sections = Vec::new();
        let mut active = self.subjects.clone();
        let mut region_start = 0;
        let mut next_index = 0;

        let mut push_region = |region: &str, subjects: &[SubjectSlot], next_index: &mut usize| {
            let segmentation = split_blocks(region, &ANCHOR, *next_index);
            *next_index += segmentation.blocks.len();
            if !segmentation.blocks.is_empty() {
                sections.push(Section {
                    subjects: subjects.to_vec(),
                    blocks: segmentation.blocks,
                });
            }
        };

        for caps in RE_LEGEND.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            push_region(&text[region_start..whole.start()], &active, &mut next_index);

            let legend = parse_legend(&caps[1]);
            if legend.is_empty() {
                debug!("Ignoring empty subject legend");
            } else {
                debug!("Subject legend switched to {} subjects", legend.len());
                active = legend;
            }
            region_start = whole.end();
        }
        push_region(&text[region_start..], &active, &mut next_index);

        sections
    }

    fn has_mark_tokens(&self, block: &StudentBlock) -> bool {
        RE_MARKS_PRESENT.is_match(&block.text)
    }

    fn extract(
        &self,
        block: &StudentBlock,
        subjects: &[SubjectSlot],
    ) -> Result<RawRecord, SkipReason> {
        let n = subjects.len();
        if n == 0 {
            return Err(SkipReason::ShapeMismatch {
                detail: "no active subjects".into(),
            });
        }

        let flat = normalise(&block.content_lines().join(" "));
        let pattern = format!(r"^(\d{{5,10}})\s*Marks\s+((?:\S+\s+){{{n}}})Grade\s+(.*)$");
        let re = Regex::new(&pattern).map_err(|e| SkipReason::ShapeMismatch {
            detail: e.to_string(),
        })?;
        let caps = re.captures(&flat).ok_or_else(|| SkipReason::ShapeMismatch {
            detail: format!("expected {n} marks tokens between 'Marks' and 'Grade'"),
        })?;

        let seat_no = caps[1].to_string();
        let marks: Vec<Option<u32>> = caps[2].split_whitespace().map(parse_marks).collect();
        let rest = &caps[3];

        let tokens: Vec<&str> = rest.split_whitespace().collect();
        let mut grades = Vec::with_capacity(n);
        let mut name_start = None;
        for (i, token) in tokens.iter().enumerate() {
            if let Some(letter) = grade_letter(token) {
                grades.push(Some(letter));
            } else if GRADE_PLACEHOLDERS.contains(token) {
                grades.push(None);
            } else {
                continue;
            }
            if grades.len() == n {
                name_start = Some(i + 1);
                break;
            }
        }
        let name_start = name_start.ok_or_else(|| SkipReason::ShapeMismatch {
            detail: format!("found {} of {n} grade tokens", grades.len()),
        })?;

        // Leading space so a `C-` list directly after the grades still matches.
        let tail = format!(" {}", tokens[name_start..].join(" "));
        let sgpa_result = RE_SGPA_RESULT.captures(&tail);
        let name_end = RE_NAME_END
            .find(&tail)
            .map(|m| m.start())
            .or_else(|| sgpa_result.as_ref().and_then(|c| c.get(0)).map(|m| m.start()))
            .unwrap_or(tail.len());
        let name_span = tail[..name_end].trim();

        let cleaned = clean_name(name_span);
        let raw_name = if name_span.starts_with('/') {
            format!("/{cleaned}")
        } else {
            cleaned
        };

        let credits = labelled_list(&tokens[name_start..], "C-", n);
        let grade_points = labelled_list(&tokens[name_start..], "GP-", n);
        let credit_points = labelled_list(&tokens[name_start..], "GPC-", n);

        let tuples = (0..n)
            .map(|i| SubjectTuple {
                credits: credits.get(i).copied().flatten(),
                grade: grades.get(i).copied().flatten(),
                grade_points: grade_points.get(i).copied().flatten(),
                credit_points: credit_points.get(i).copied().flatten(),
                marks: marks.get(i).copied().flatten(),
            })
            .collect();

        let (sgpi, result) = match &sgpa_result {
            Some(c) => (parse_decimal(&c[1]), c[2].to_string()),
            None => (None, String::new()),
        };
        let labelled = LabelledFields::scan(&block.text);

        Ok(RawRecord {
            seat_no,
            raw_name,
            mother_name: labelled.mother_name,
            prn: labelled.prn,
            result,
            subjects: tuples,
            sgpi: sgpi.or(labelled.sgpi),
            cgpi: labelled.cgpi,
            final_grade: labelled.final_grade,
            remark: labelled.remark,
        })
    }
}

/// Parse `CODE Name | CODE Name | …` into subject slots.
fn parse_legend(body: &str) -> Vec<SubjectSlot> {
    body.split('|')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| match RE_LEGEND_ITEM.captures(item) {
            Some(c) => SubjectSlot::new(&c[1], c[2].trim()),
            None => SubjectSlot::new(item, item),
        })
        .collect()
}

/// Up to `n` decimals following a `label` token (`C-`, or glued as `C-3`).
fn labelled_list(tokens: &[&str], label: &str, n: usize) -> Vec<Option<f64>> {
    let Some(pos) = tokens
        .iter()
        .position(|t| *t == label || t.strip_prefix(label).is_some_and(|r| parse_decimal(r).is_some()))
    else {
        return Vec::new();
    };

    let glued = tokens[pos].strip_prefix(label).filter(|r| !r.is_empty());
    glued
        .into_iter()
        .chain(tokens[pos + 1..].iter().copied())
        .take(n)
        .map(parse_decimal)
        .take_while(Option::is_some)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semester::Semester;

    const LINE: &str = "1234567 Marks 45 38 60 52 41 Grade O A B C P /JANE DOE C- 3 3 3 3 3 GP- 10 9 8 7 4 GPC- 30 27 24 21 12 7.60 P";

    fn grammar() -> GradeCountGrammar {
        GradeCountGrammar::new(Semester::III.profile().subjects)
    }

    #[test]
    fn surname_starting_with_tot_stays_in_name() {
        let g = grammar();
        let text = "1234567 Marks 45 38 60 52 41 Grade A B O C B RAVI TOTLANI C- 3 3 3 3 3 8.40 P";
        let raw = g
            .extract(&StudentBlock::new(0, text), g.default_subjects())
            .unwrap();
        assert_eq!(raw.raw_name, "RAVI TOTLANI");
        assert_eq!(raw.result, "P");
    }

    #[test]
    fn full_line_extracts_every_field() {
        let g = grammar();
        let block = StudentBlock::new(0, LINE);
        assert!(g.has_mark_tokens(&block));
        let raw = g.extract(&block, g.default_subjects()).unwrap();

        assert_eq!(raw.seat_no, "1234567");
        assert_eq!(raw.raw_name, "/JANE DOE");
        assert_eq!(raw.result, "P");
        assert_eq!(raw.sgpi, Some(7.6));
        assert_eq!(raw.subjects.len(), 5);
        assert_eq!(raw.subjects[0].marks, Some(45));
        assert_eq!(raw.subjects[0].grade, Some('O'));
        assert_eq!(raw.subjects[0].credits, Some(3.0));
        assert_eq!(raw.subjects[0].grade_points, Some(10.0));
        assert_eq!(raw.subjects[0].credit_points, Some(30.0));
        assert_eq!(raw.subjects[4].grade, Some('P'));
        assert_eq!(raw.subjects[4].credit_points, Some(12.0));
    }

    #[test]
    fn wrapped_block_is_flattened() {
        let g = grammar();
        let text = "1234567 Marks 45 38 60 52 41 Grade O A B C P JOHN\n   DOE C- 3 3 3 3 3\nGP- 10 9 8 7 4 GPC- 30 27 24 21 12 7.60 P";
        let raw = g.extract(&StudentBlock::new(0, text), g.default_subjects()).unwrap();
        assert_eq!(raw.raw_name, "JOHN DOE");
        assert_eq!(raw.subjects[3].grade_points, Some(7.0));
    }

    #[test]
    fn absent_marks_and_placeholder_grade() {
        let g = grammar();
        let text = "1234568 Marks 45 AB 60 52 41 Grade O -- B C P RAVI KUMAR C- 3 3 3 3 3 5.10 F";
        let raw = g.extract(&StudentBlock::new(0, text), g.default_subjects()).unwrap();
        assert_eq!(raw.subjects[1].marks, None);
        assert_eq!(raw.subjects[1].grade, None);
        assert_eq!(raw.subjects[2].grade, Some('B'));
        assert_eq!(raw.raw_name, "RAVI KUMAR");
        assert_eq!(raw.result, "F");
        assert_eq!(raw.subjects[0].grade_points, None);
    }

    #[test]
    fn wrong_marks_count_is_shape_mismatch() {
        let g = grammar();
        let text = "1234567 Marks 45 38 60 Grade O A B JOHN DOE 7.60 P";
        let err = g.extract(&StudentBlock::new(0, text), g.default_subjects()).unwrap_err();
        assert!(matches!(err, SkipReason::ShapeMismatch { .. }));
    }

    #[test]
    fn legend_switches_subjects_for_following_blocks() {
        let g = grammar();
        let text = "\
1111111 Marks 45 38 60 52 41 Grade O A B C P JOHN DOE 7.60 P
SUBJECTS: CSC401 Engineering Mathematics-IV | CSC402 Analysis of Algorithm
2222222 Marks 45 38 Grade O A JANE ROE 8.00 P
3333333 Marks 50 50 Grade A A RAM LAL 9.00 P";
        let sections = g.segment(text);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].subjects.len(), 5);
        assert_eq!(sections[0].blocks.len(), 1);
        assert_eq!(sections[1].subjects[1], SubjectSlot::new("CSC402", "Analysis of Algorithm"));
        assert_eq!(sections[1].blocks.len(), 2);
        assert_eq!(sections[1].blocks[0].index, 1);

        let raw = g.extract(&sections[1].blocks[1], &sections[1].subjects).unwrap();
        assert_eq!(raw.raw_name, "RAM LAL");
        assert_eq!(raw.subjects.len(), 2);
    }

    #[test]
    fn labelled_list_handles_glued_label() {
        let tokens = ["C-3", "4", "2", "GP-", "9"];
        assert_eq!(labelled_list(&tokens, "C-", 5), vec![Some(3.0), Some(4.0), Some(2.0)]);
        assert_eq!(labelled_list(&tokens, "GP-", 5), vec![Some(9.0)]);
        assert!(labelled_list(&tokens, "GPC-", 5).is_empty());
    }
}

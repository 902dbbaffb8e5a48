//! Noise stripping: remove repeating page boilerplate from reflowed text.
//!
//! Every gazette page repeats the university banner, the examination title,
//! the column-header block and a legend of symbols. None of it belongs to a
//! student, and left in place it would be glued to whichever block precedes
//! the page break.
//!
//! Removal is marker-driven: each [`NoiseRule`] names a start marker and an
//! end marker, and everything from a line containing the start through the
//! next line containing the end (inclusive) is dropped. A rule whose markers
//! are equal removes exactly the lines carrying that marker.
//!
//! ## Passes (applied in order)
//!
//! 1. Marker-delimited block removal
//! 2. Drop blank lines
//! 3. Collapse runs of dash-separator lines to one
//!
//! A start marker without a following end marker swallows the rest of the
//! document. The templates are fixed per semester, so this is logged at
//! `warn` rather than raised.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A start/end marker pair. Markers are whitespace-normalised on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoiseRule {
    pub start: String,
    pub end: String,
}

impl NoiseRule {
    pub fn new(start: impl AsRef<str>, end: impl AsRef<str>) -> Self {
        Self {
            start: normalise(start.as_ref()),
            end: normalise(end.as_ref()),
        }
    }

    /// A rule that removes single lines containing `marker`.
    pub fn line(marker: impl AsRef<str>) -> Self {
        Self::new(marker.as_ref(), marker.as_ref())
    }
}

/// Apply all cleaning passes to reflowed document text.
pub fn strip_noise(text: &str, rules: &[NoiseRule]) -> String {
    let s = remove_marked_blocks(text, rules);
    let s = drop_blank_lines(&s);
    collapse_separator_runs(&s)
}

/// Collapse internal whitespace runs (spaces, tabs) to single spaces.
pub fn normalise(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Pass 1: marker-delimited removal ─────────────────────────────────────────

fn remove_marked_blocks(text: &str, rules: &[NoiseRule]) -> String {
    let active: Vec<&NoiseRule> = rules
        .iter()
        .filter(|r| !r.start.is_empty() && !r.end.is_empty())
        .collect();

    let mut kept: Vec<&str> = Vec::new();
    let mut inside = false;
    let mut removed = 0usize;

    for line in text.lines() {
        let norm = normalise(line);

        if !inside && active.iter().any(|r| norm.contains(r.start.as_str())) {
            inside = true;
        }

        if inside {
            removed += 1;
            if active.iter().any(|r| norm.contains(r.end.as_str())) {
                inside = false;
            }
            continue;
        }

        kept.push(line);
    }

    if inside {
        warn!("Noise block never closed; dropped the remainder of the document");
    }
    debug!("Noise stripper removed {} lines", removed);

    kept.join("\n")
}

// ── Pass 2: blank lines ──────────────────────────────────────────────────────

fn drop_blank_lines(text: &str) -> String {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Pass 3: separator runs ───────────────────────────────────────────────────

static RE_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s\-=_]*-{3,}[\s\-=_]*$").unwrap());

/// `true` for lines made only of dashes (and spacing/underscores/equals).
pub fn is_separator_line(line: &str) -> bool {
    RE_SEPARATOR.is_match(line)
}

fn collapse_separator_runs(text: &str) -> String {
    let mut result: Vec<&str> = Vec::new();
    let mut previous_was_separator = false;

    for line in text.lines() {
        let separator = is_separator_line(line);
        if separator && previous_was_separator {
            continue;
        }
        previous_was_separator = separator;
        result.push(line);
    }

    result.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn removes_banner_through_legend() {
        let text = "University of Mumbai, Mumbai\njunk line\nFEC201 TW-Engineering Mathematics-II Term Work:\nREAL DATA";
        let rules = [NoiseRule::new(
            "University of Mumbai, Mumbai",
            "FEC201 TW-Engineering Mathematics-II Term Work:",
        )];
        assert_eq!(strip_noise(text, &rules), "REAL DATA");
    }

    #[test]
    fn markers_match_after_whitespace_normalisation() {
        let text = "University   of\tMumbai,  Mumbai\nFEC201  TW-Engineering Mathematics-II   Term Work:\nkeep";
        let rules = [NoiseRule::new(
            "University of Mumbai, Mumbai",
            "FEC201 TW-Engineering Mathematics-II Term Work:",
        )];
        assert_eq!(strip_noise(text, &rules), "keep");
    }

    #[test]
    fn single_line_rule_removes_only_that_line() {
        let text = "a\nPAGE NO 3\nb";
        assert_eq!(strip_noise(text, &[NoiseRule::line("PAGE NO")]), "a\nb");
    }

    #[test]
    fn unterminated_block_drops_remainder() {
        let text = "keep\nSTART\nx\ny";
        let rules = [NoiseRule::new("START", "END")];
        assert_eq!(strip_noise(text, &rules), "keep");
    }

    #[test]
    fn end_marker_outside_block_is_kept() {
        let text = "END here\nSTART\nmid\nEND\ntail";
        let rules = [NoiseRule::new("START", "END")];
        assert_eq!(strip_noise(text, &rules), "END here\ntail");
    }

    #[test]
    fn blank_lines_dropped_and_separators_collapsed() {
        let text = "a\n\n   \n-----\n----------\n - - --- \nb\n-----";
        assert_eq!(strip_noise(text, &[]), "a\n-----\nb\n-----");
    }

    #[test]
    fn separator_detection() {
        assert!(is_separator_line("------"));
        assert!(is_separator_line("  ---- ----  "));
        assert!(!is_separator_line("C- 3 3 3"));
        assert!(!is_separator_line("--"));
    }

    #[test]
    fn cleaning_is_idempotent() {
        let text = "University of Mumbai, Mumbai\nhdr\nEXAMINATION HELD IN MAY 2022\n\n1234567 A\n----\n----\nPAGE NO 1\n1234568 B\n\n";
        let rules = [
            NoiseRule::new("University of Mumbai, Mumbai", "EXAMINATION HELD IN"),
            NoiseRule::line("PAGE NO"),
        ];
        let once = strip_noise(text, &rules);
        assert_eq!(once, "1234567 A\n----\n1234568 B");
        assert_eq!(strip_noise(&once, &rules), once);
    }

    fn gazette_line() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("University of Mumbai, Mumbai".to_string()),
            Just("OFFICE REGISTER EXAMINATION HELD IN MAY 2022".to_string()),
            Just("PAGE NO 4".to_string()),
            Just("--------".to_string()),
            Just(" - - --- ".to_string()),
            Just(String::new()),
            Just("   ".to_string()),
            "[0-9]{7} [A-Z ]{0,12}\\|[ 0-9A-Z]{0,10}",
        ]
    }

    proptest! {
        #[test]
        fn cleaning_twice_equals_cleaning_once(
            lines in proptest::collection::vec(gazette_line(), 0..30),
        ) {
            let rules = [
                NoiseRule::new("University of Mumbai, Mumbai", "EXAMINATION HELD IN"),
                NoiseRule::line("PAGE NO"),
            ];
            let text = lines.join("\n");
            let once = strip_noise(&text, &rules);
            prop_assert_eq!(strip_noise(&once, &rules), once);
        }
    }
}

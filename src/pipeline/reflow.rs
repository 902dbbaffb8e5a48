//! Glyph reflow: rebuild reading-order text from positioned glyph runs.
//!
//! The gazette generator paints every field as an independently positioned
//! run, so the raw text layer has no reliable order or spacing. We recover
//! both from geometry alone:
//!
//! 1. Sort runs by `y` descending (top of page first), then `x` ascending.
//! 2. Walk the runs; a run more than `line_tolerance` away from the current
//!    line's reference `y` starts a new line and becomes the new reference.
//! 3. Emit each line's runs left to right, inserting one separator where the
//!    gap between the previous run's end (`x + width`) and the next run's
//!    start exceeds `gap_threshold`.
//! 4. Join lines with `\n` and pages with `\n\n`.
//!
//! Runs inside a line are re-sorted by `x` after grouping: glyph baselines
//! jitter by a unit or two inside the tolerance band, and ordering purely by
//! `y` would interleave them. Overlapping runs are kept in `x` order without
//! merging; no multi-column detection is attempted.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One fragment of rendered text in page coordinates (higher `y` is higher
/// on the page).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedGlyphRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
}

impl PositionedGlyphRun {
    pub fn new(text: impl Into<String>, x: f32, y: f32, width: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            width,
        }
    }

    fn end(&self) -> f32 {
        self.x + self.width
    }
}

/// What to insert at a horizontal gap inside a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GapSeparator {
    /// A single space (default).
    #[default]
    Space,
    /// A tab, for grammars that must tell column boundaries from spacing
    /// inside a field.
    Tab,
}

impl GapSeparator {
    fn as_char(self) -> char {
        match self {
            GapSeparator::Space => ' ',
            GapSeparator::Tab => '\t',
        }
    }
}

/// Geometry thresholds for [`reflow_page`], in page units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReflowOptions {
    /// Maximum vertical distance from the line reference. Default: 5.0.
    pub line_tolerance: f32,
    /// Minimum horizontal gap that produces a separator. Default: 1.0.
    pub gap_threshold: f32,
    pub separator: GapSeparator,
}

impl Default for ReflowOptions {
    fn default() -> Self {
        Self {
            line_tolerance: 5.0,
            gap_threshold: 1.0,
            separator: GapSeparator::Space,
        }
    }
}

/// Reflow one page's runs into newline-separated text.
pub fn reflow_page(runs: &[PositionedGlyphRun], opts: &ReflowOptions) -> String {
    let mut sorted: Vec<&PositionedGlyphRun> =
        runs.iter().filter(|r| !r.text.trim().is_empty()).collect();

    sorted.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    let mut lines: Vec<Vec<&PositionedGlyphRun>> = Vec::new();
    let mut reference: Option<f32> = None;

    for run in sorted {
        match (reference, lines.last_mut()) {
            (Some(y), Some(line)) if (run.y - y).abs() <= opts.line_tolerance => line.push(run),
            _ => {
                lines.push(vec![run]);
                reference = Some(run.y);
            }
        }
    }

    lines
        .iter_mut()
        .map(|line| {
            line.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
            join_line(line, opts)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reflow every page and join them with a blank line.
pub fn reflow_document(pages: &[Vec<PositionedGlyphRun>], opts: &ReflowOptions) -> String {
    pages
        .iter()
        .map(|runs| reflow_page(runs, opts))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn join_line(runs: &[&PositionedGlyphRun], opts: &ReflowOptions) -> String {
    let mut text = String::new();
    let mut previous: Option<&PositionedGlyphRun> = None;

    for run in runs {
        if let Some(prev) = previous {
            if run.x - prev.end() > opts.gap_threshold {
                text.push(opts.separator.as_char());
            }
        }
        text.push_str(&run.text);
        previous = Some(run);
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, x: f32, y: f32, width: f32) -> PositionedGlyphRun {
        PositionedGlyphRun::new(text, x, y, width)
    }

    #[test]
    fn empty_page_is_empty_text() {
        assert_eq!(reflow_page(&[], &ReflowOptions::default()), "");
    }

    #[test]
    fn orders_top_to_bottom_left_to_right() {
        let runs = vec![
            run("second", 10.0, 700.0, 30.0),
            run("B", 60.0, 800.0, 5.0),
            run("A", 10.0, 800.0, 5.0),
        ];
        assert_eq!(reflow_page(&runs, &ReflowOptions::default()), "A B\nsecond");
    }

    #[test]
    fn baseline_jitter_stays_on_one_line() {
        // "g" sits 2 units lower than its neighbours.
        let runs = vec![
            run("1234567", 10.0, 500.0, 35.0),
            run("JANE", 50.0, 498.0, 20.0),
            run("DOE", 75.0, 500.0, 15.0),
        ];
        assert_eq!(
            reflow_page(&runs, &ReflowOptions::default()),
            "1234567 JANE DOE"
        );
    }

    #[test]
    fn tolerance_is_measured_from_line_reference() {
        let runs = vec![
            run("a", 0.0, 100.0, 5.0),
            run("b", 10.0, 96.0, 5.0),
            // 7 units below the reference even though only 3 below "b".
            run("c", 20.0, 93.0, 5.0),
        ];
        assert_eq!(reflow_page(&runs, &ReflowOptions::default()), "a b\nc");
    }

    #[test]
    fn abutting_runs_join_without_space() {
        let runs = vec![run("Mathe", 0.0, 10.0, 25.0), run("matics", 25.5, 10.0, 30.0)];
        assert_eq!(reflow_page(&runs, &ReflowOptions::default()), "Mathematics");
    }

    #[test]
    fn tab_separator_option() {
        let runs = vec![run("45", 0.0, 10.0, 10.0), run("A", 40.0, 10.0, 5.0)];
        let opts = ReflowOptions {
            separator: GapSeparator::Tab,
            ..ReflowOptions::default()
        };
        assert_eq!(reflow_page(&runs, &opts), "45\tA");
    }

    #[test]
    fn overlapping_runs_kept_in_x_order() {
        let runs = vec![run("XY", 5.0, 10.0, 10.0), run("AB", 0.0, 10.0, 10.0)];
        assert_eq!(reflow_page(&runs, &ReflowOptions::default()), "ABXY");
    }

    #[test]
    fn whitespace_runs_are_ignored() {
        let runs = vec![
            run("A", 0.0, 10.0, 5.0),
            run("   ", 5.0, 10.0, 15.0),
            run("B", 20.0, 10.0, 5.0),
        ];
        assert_eq!(reflow_page(&runs, &ReflowOptions::default()), "A B");
    }

    #[test]
    fn pages_joined_with_blank_line() {
        let pages = vec![vec![run("p1", 0.0, 10.0, 5.0)], vec![run("p2", 0.0, 10.0, 5.0)]];
        assert_eq!(
            reflow_document(&pages, &ReflowOptions::default()),
            "p1\n\np2"
        );
    }
}

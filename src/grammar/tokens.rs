//! Token-level helpers shared by the layout grammars.
//!
//! Numbers in the gazette come decorated: `45+` (grace marks), `38*`
//! (condoned), `62@2` (ordinance credit), `AB` (absent). The helpers here
//! normalise those so grammars deal only in `Option<u32>` / `Option<f64>`.

use crate::output::SubjectTuple;
use once_cell::sync::Lazy;
use regex::Regex;

// ── Numbers ──────────────────────────────────────────────────────────────────

static RE_DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?$").unwrap());

static RE_MARKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)(?:[+*#@$].*)?$").unwrap());

/// Parse a plain decimal token (`3`, `7.25`). Anything else is `None`.
pub fn parse_decimal(token: &str) -> Option<f64> {
    let token = token.trim();
    if !RE_DECIMAL.is_match(token) {
        return None;
    }
    token.parse().ok()
}

/// Parse a marks token, stripping trailing `+ * # @ $` decorations.
///
/// Non-numeric tokens (`AB`, `--`, `NA`) are `None`, never zero.
pub fn parse_marks(token: &str) -> Option<u32> {
    RE_MARKS
        .captures(token.trim())
        .and_then(|c| c[1].parse().ok())
}

/// The last marks-like token of a segment.
pub fn last_integer(segment: &str) -> Option<u32> {
    segment.split_whitespace().filter_map(parse_marks).last()
}

/// A single uppercase letter, as printed in grade columns.
pub fn grade_letter(token: &str) -> Option<char> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_uppercase() => Some(c),
        _ => None,
    }
}

// ── Subject tuples ───────────────────────────────────────────────────────────

static RE_TUPLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s+([A-Z])\s+(\d+(?:\.\d+)?)\s+(\d+(?:\.\d+)?)").unwrap()
});

/// `true` when `text` contains a `credits grade points credit-points` run.
pub fn has_tuple(text: &str) -> bool {
    RE_TUPLE.is_match(text)
}

/// Parse the first `credits grade gp c×g` run in a segment. Marks are left
/// unset; they come from a different line.
pub fn parse_tuple(segment: &str) -> Option<SubjectTuple> {
    let caps = RE_TUPLE.captures(segment)?;
    Some(SubjectTuple {
        credits: parse_decimal(&caps[1]),
        grade: caps[2].chars().next(),
        grade_points: parse_decimal(&caps[3]),
        credit_points: parse_decimal(&caps[4]),
        marks: None,
    })
}

// ── Labelled fields ──────────────────────────────────────────────────────────

static RE_PRN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bPRN\s*[:.]?\s*\(?([A-Z0-9]{8,20})\)?").unwrap());
static RE_MOTHER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bMOTHER(?:'S)?(?:\s+NAME)?\s*[:.]\s*([A-Z][A-Z .']*)").unwrap());
static RE_SGPI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bSGP[IA]\s*[:.]?\s*(\d+(?:\.\d+)?)").unwrap());
static RE_CGPI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bCGP[IA]\s*[:.]?\s*(\d+(?:\.\d+)?)").unwrap());
static RE_GRADE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bGRADE\s*[:.]\s*([A-Z][+]?)").unwrap());
static RE_REMARK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bREMARKS?\s*[:.]\s*(.+)$").unwrap());

/// Words that begin another labelled field; free-text captures stop here.
const LABEL_WORDS: &[&str] = &[
    "PRN", "MOTHER", "MOTHER'S", "SGPI", "SGPA", "CGPI", "CGPA", "GRADE", "REMARK", "REMARKS",
    "RESULT",
];

/// Optional fields printed as `LABEL: value` anywhere in a block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelledFields {
    pub prn: Option<String>,
    pub mother_name: Option<String>,
    pub sgpi: Option<f64>,
    pub cgpi: Option<f64>,
    pub final_grade: Option<String>,
    pub remark: Option<String>,
}

impl LabelledFields {
    /// Scan every line of `text` for labelled fields. The first occurrence
    /// of each label wins.
    pub fn scan(text: &str) -> Self {
        let mut fields = Self::default();
        for line in text.lines() {
            fields.prn = fields.prn.or_else(|| capture(&RE_PRN, line));
            fields.mother_name = fields
                .mother_name
                .or_else(|| capture(&RE_MOTHER, line).and_then(|v| until_label(&v)));
            fields.sgpi = fields
                .sgpi
                .or_else(|| capture(&RE_SGPI, line).and_then(|v| parse_decimal(&v)));
            fields.cgpi = fields
                .cgpi
                .or_else(|| capture(&RE_CGPI, line).and_then(|v| parse_decimal(&v)));
            fields.final_grade = fields.final_grade.or_else(|| capture(&RE_GRADE, line));
            fields.remark = fields
                .remark
                .or_else(|| capture(&RE_REMARK, line).and_then(|v| until_label(&v)));
        }
        fields
    }
}

/// Byte offset of the first labelled-field keyword in `text`, if any.
pub fn first_label_offset(text: &str) -> Option<usize> {
    let mut offset = 0;
    for word in text.split_inclusive(char::is_whitespace) {
        let bare = word.trim().trim_end_matches([':', '.']);
        if LABEL_WORDS.contains(&bare) {
            return Some(offset);
        }
        offset += word.len();
    }
    None
}

/// Strip everything but letters and spaces, collapsing whitespace.
pub fn clean_name(span: &str) -> String {
    span.chars()
        .map(|c| if c.is_alphabetic() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn capture(re: &Regex, line: &str) -> Option<String> {
    re.captures(line).map(|c| c[1].trim().to_string())
}

fn until_label(value: &str) -> Option<String> {
    let cut = first_label_offset(value).unwrap_or(value.len());
    let kept = value[..cut].trim();
    (!kept.is_empty()).then(|| kept.to_string())
}

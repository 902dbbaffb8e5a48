//! Semester identifiers and the per-semester gazette templates.
//!
//! Every supported semester maps to exactly one [`Layout`] and one
//! [`SemesterProfile`]: the ordered subject slots, the boilerplate marker
//! pairs removed by the noise stripper, and the segmentation anchor of its
//! layout. The tables are fitted to the exam-office report generator as it
//! prints Computer Engineering gazettes; a template change upstream needs a
//! matching change here.

use crate::error::MarksheetError;
use crate::pipeline::noise::NoiseRule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A semester with a known gazette template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semester {
    I,
    II,
    III,
    IV,
    V,
    VI,
}

impl Semester {
    /// Every supported semester, in order.
    pub const ALL: [Semester; 6] = [
        Semester::I,
        Semester::II,
        Semester::III,
        Semester::IV,
        Semester::V,
        Semester::VI,
    ];

    pub fn number(self) -> u8 {
        match self {
            Semester::I => 1,
            Semester::II => 2,
            Semester::III => 3,
            Semester::IV => 4,
            Semester::V => 5,
            Semester::VI => 6,
        }
    }

    pub fn roman(self) -> &'static str {
        match self {
            Semester::I => "I",
            Semester::II => "II",
            Semester::III => "III",
            Semester::IV => "IV",
            Semester::V => "V",
            Semester::VI => "VI",
        }
    }

    /// The record layout the report generator uses for this semester.
    pub fn layout(self) -> Layout {
        match self {
            Semester::I | Semester::II => Layout::PipeColumn,
            Semester::III | Semester::IV => Layout::GradeCount,
            Semester::V | Semester::VI => Layout::PaperCode,
        }
    }

    /// Build the full template for this semester.
    pub fn profile(self) -> SemesterProfile {
        let (subjects, header_end): (&[(&str, &str)], &str) = match self {
            Semester::I => (SEM_I_SUBJECTS, "FEC101 TW-Engineering Mathematics-I Term Work:"),
            Semester::II => (SEM_II_SUBJECTS, "FEC201 TW-Engineering Mathematics-II Term Work:"),
            Semester::III => (SEM_III_SUBJECTS, "EXAMINATION HELD IN"),
            Semester::IV => (SEM_IV_SUBJECTS, "EXAMINATION HELD IN"),
            Semester::V => (SEM_V_SUBJECTS, "EXAMINATION HELD IN"),
            Semester::VI => (SEM_VI_SUBJECTS, "EXAMINATION HELD IN"),
        };

        let mut noise_rules = vec![NoiseRule::new(PAGE_HEADER_START, header_end)];
        match self.layout() {
            Layout::GradeCount => noise_rules.push(NoiseRule::new("SEAT NO", "RESULT")),
            Layout::PaperCode => noise_rules.push(NoiseRule::new("SEAT NO", "REMARK")),
            Layout::PipeColumn | Layout::WhitespaceRun => {}
        }
        noise_rules.push(NoiseRule::line(GENDER_LEGEND));
        noise_rules.push(NoiseRule::line(PAGE_FOOTER));

        SemesterProfile {
            semester: self,
            layout: self.layout(),
            subjects: subjects
                .iter()
                .map(|(code, name)| SubjectSlot::new(*code, *name))
                .collect(),
            noise_rules,
        }
    }

    fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|s| s.roman())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sem {}", self.roman())
    }
}

impl FromStr for Semester {
    type Err = MarksheetError;

    /// Accepts `3`, `III`, `sem3`, `Sem-III`, `semester 3` and similar.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let core = lowered
            .strip_prefix("semester")
            .or_else(|| lowered.strip_prefix("sem"))
            .unwrap_or(&lowered)
            .trim_start_matches(|c: char| c == '-' || c == '_' || c.is_whitespace());

        let found = match core {
            "1" | "i" => Some(Semester::I),
            "2" | "ii" => Some(Semester::II),
            "3" | "iii" => Some(Semester::III),
            "4" | "iv" => Some(Semester::IV),
            "5" | "v" => Some(Semester::V),
            "6" | "vi" => Some(Semester::VI),
            _ => None,
        };

        found.ok_or_else(|| MarksheetError::UnsupportedSemester {
            requested: s.to_string(),
            supported: Self::supported_list(),
        })
    }
}

/// The closed set of record layouts. Each one has its own grammar in
/// [`crate::grammar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    /// `|`-separated subject column groups with a parallel totals line.
    PipeColumn,
    /// `Marks … Grade …` run located by counting grade tokens.
    GradeCount,
    /// Per-student paper-code rows at fixed line offsets.
    PaperCode,
    /// Loose labelled-token scan used for summary parsing.
    WhitespaceRun,
}

impl Layout {
    /// Multi-line regex marking the first line of a student block.
    pub fn anchor(self) -> &'static str {
        match self {
            Layout::PipeColumn | Layout::PaperCode => r"(?m)^\d{7}\s",
            Layout::GradeCount => r"(?m)^\d{5,10}\s*Marks",
            Layout::WhitespaceRun => r"(?m)^\d{7}",
        }
    }
}

/// One subject column of a semester, in master order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSlot {
    /// Paper code as printed in the gazette, e.g. `CSC501`.
    pub code: String,
    /// Display name; also the CSV column prefix.
    pub name: String,
}

impl SubjectSlot {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Everything the pipeline needs to know about one semester's template.
#[derive(Debug, Clone)]
pub struct SemesterProfile {
    pub semester: Semester,
    pub layout: Layout,
    /// Master subject order. For legend-driven layouts this is the fallback
    /// used before the first legend is seen.
    pub subjects: Vec<SubjectSlot>,
    pub noise_rules: Vec<NoiseRule>,
}

// ── Template tables ──────────────────────────────────────────────────────

const PAGE_HEADER_START: &str = "University of Mumbai, Mumbai";
const GENDER_LEGEND: &str = "/ - FEMALE";
const PAGE_FOOTER: &str = "PAGE NO";

const SEM_I_SUBJECTS: &[(&str, &str)] = &[
    ("FEC101", "Engineering Mathematics-I"),
    ("FEC102", "Engineering Physics-I"),
    ("FEC103", "Engineering Chemistry-I"),
    ("FEC104", "Engineering Mechanics"),
    ("FEC105", "Basic Electrical Engineering"),
    ("FEL106", "Basic Workshop Practice-I"),
];

const SEM_II_SUBJECTS: &[(&str, &str)] = &[
    ("FEC201", "Engineering Mathematics-II"),
    ("FEC202", "Engineering Physics-II"),
    ("FEC203", "Engineering Chemistry-II"),
    ("FEC204", "Engineering Graphics"),
    ("FEC205", "C Programming"),
    ("FEC206", "Professional Communication and Ethics-I"),
    ("FEL206", "Basic Workshop Practice-II"),
];

const SEM_III_SUBJECTS: &[(&str, &str)] = &[
    ("CSC301", "Engineering Mathematics-III"),
    ("CSC302", "Discrete Structures and Graph Theory"),
    ("CSC303", "Data Structure"),
    ("CSC304", "Digital Logic and Computer Architecture"),
    ("CSC305", "Computer Graphics"),
];

const SEM_IV_SUBJECTS: &[(&str, &str)] = &[
    ("CSC401", "Engineering Mathematics-IV"),
    ("CSC402", "Analysis of Algorithm"),
    ("CSC403", "Database Management System"),
    ("CSC404", "Operating System"),
    ("CSC405", "Microprocessor"),
];

const SEM_V_SUBJECTS: &[(&str, &str)] = &[
    ("CSC501", "Theoretical Computer Science"),
    ("CSC502", "Software Engineering"),
    ("CSC503", "Computer Network"),
    ("CSC504", "Data Warehousing and Mining"),
    ("CSDL501", "Department Level Optional Course-1"),
    ("CSL501", "Software Engineering Lab"),
    ("CSL502", "Computer Network Lab"),
    ("CSL503", "Data Warehousing and Mining Lab"),
    ("CSL504", "Business Communication and Ethics-II"),
    ("CSM501", "Mini Project 2A"),
];

const SEM_VI_SUBJECTS: &[(&str, &str)] = &[
    ("CSC601", "System Programming and Compiler Construction"),
    ("CSC602", "Cryptography and System Security"),
    ("CSC603", "Mobile Computing"),
    ("CSC604", "Artificial Intelligence"),
    ("CSDL601", "Department Level Optional Course-2"),
    ("CSL601", "System Programming and Compiler Construction Lab"),
    ("CSL602", "Cryptography and System Security Lab"),
    ("CSL603", "Mobile Computing Lab"),
    ("CSL604", "Artificial Intelligence Lab"),
    ("CSM601", "Mini Project 2B"),
];

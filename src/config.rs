//! Configuration types for a marksheet parse.
//!
//! Every knob lives in [`ParseConfig`], built via [`ParseConfigBuilder`].
//! The semester is the only required setting; everything else has a
//! documented default. A config is plain data (plus an optional callback)
//! so it can be shared across threads and logged.

use crate::error::MarksheetError;
use crate::pipeline::noise::NoiseRule;
use crate::pipeline::reflow::{GapSeparator, ReflowOptions};
use crate::progress::ProgressCallback;
use crate::semester::Semester;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for one parse.
///
/// # Example
/// ```rust
/// use marksheet_parser::{ParseConfig, ParseMode, Semester};
///
/// let config = ParseConfig::builder(Semester::III)
///     .mode(ParseMode::Summary)
///     .parse_timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.semester, Semester::III);
/// ```
#[derive(Clone)]
pub struct ParseConfig {
    /// Which gazette template to apply.
    pub semester: Semester,

    /// Full subject extraction or identity-only summary. Default: Full.
    pub mode: ParseMode,

    /// Pages whose text layer is read. Default: all.
    pub pages: PageSelection,

    /// User password for encrypted gazettes.
    pub password: Option<String>,

    /// Geometry thresholds for rebuilding lines from glyph runs.
    pub reflow: ReflowOptions,

    /// Marker pairs removed in addition to the semester's own boilerplate.
    pub extra_noise_rules: Vec<NoiseRule>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Whole-document timeout in seconds, covering input, extraction and the
    /// text stages of the async entry points (including `parse_text_file`).
    /// The synchronous `parse_text` ignores it. On expiry no records are
    /// returned. Default: none.
    pub parse_timeout_secs: Option<u64>,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for ParseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseConfig")
            .field("semester", &self.semester)
            .field("mode", &self.mode)
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("reflow", &self.reflow)
            .field("extra_noise_rules", &self.extra_noise_rules)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("parse_timeout_secs", &self.parse_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ParseProgressCallback>"),
            )
            .finish()
    }
}

impl ParseConfig {
    /// Defaults for `semester`.
    pub fn new(semester: Semester) -> Self {
        Self {
            semester,
            mode: ParseMode::default(),
            pages: PageSelection::default(),
            password: None,
            reflow: ReflowOptions::default(),
            extra_noise_rules: Vec::new(),
            download_timeout_secs: 120,
            parse_timeout_secs: None,
            progress_callback: None,
        }
    }

    /// Create a builder for `semester`.
    pub fn builder(semester: Semester) -> ParseConfigBuilder {
        ParseConfigBuilder {
            config: Self::new(semester),
        }
    }

    /// Builder for a semester given by name (`"3"`, `"III"`, `"sem3"`).
    ///
    /// Unknown names fail here, before any document is opened.
    pub fn builder_for(semester: &str) -> Result<ParseConfigBuilder, MarksheetError> {
        Ok(Self::builder(semester.parse()?))
    }
}

/// Builder for [`ParseConfig`].
#[derive(Debug)]
pub struct ParseConfigBuilder {
    config: ParseConfig,
}

impl ParseConfigBuilder {
    pub fn mode(mut self, mode: ParseMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn reflow(mut self, reflow: ReflowOptions) -> Self {
        self.config.reflow = reflow;
        self
    }

    pub fn line_tolerance(mut self, units: f32) -> Self {
        self.config.reflow.line_tolerance = units;
        self
    }

    pub fn gap_threshold(mut self, units: f32) -> Self {
        self.config.reflow.gap_threshold = units;
        self
    }

    pub fn gap_separator(mut self, separator: GapSeparator) -> Self {
        self.config.reflow.separator = separator;
        self
    }

    pub fn noise_rule(mut self, rule: NoiseRule) -> Self {
        self.config.extra_noise_rules.push(rule);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn parse_timeout_secs(mut self, secs: u64) -> Self {
        self.config.parse_timeout_secs = Some(secs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ParseConfig, MarksheetError> {
        let c = &self.config;
        if !c.reflow.line_tolerance.is_finite() || c.reflow.line_tolerance <= 0.0 {
            return Err(MarksheetError::InvalidConfig(format!(
                "line tolerance must be a positive number, got {}",
                c.reflow.line_tolerance
            )));
        }
        if !c.reflow.gap_threshold.is_finite() || c.reflow.gap_threshold < 0.0 {
            return Err(MarksheetError::InvalidConfig(format!(
                "gap threshold must be zero or more, got {}",
                c.reflow.gap_threshold
            )));
        }
        if c.parse_timeout_secs == Some(0) {
            return Err(MarksheetError::InvalidConfig(
                "parse timeout must be at least 1 second".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(MarksheetError::InvalidConfig(
                "download timeout must be at least 1 second".into(),
            ));
        }
        if let Some(rule) = c
            .extra_noise_rules
            .iter()
            .find(|r| r.start.is_empty() || r.end.is_empty())
        {
            return Err(MarksheetError::InvalidConfig(format!(
                "noise rule markers must be non-empty: {rule:?}"
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How much of each record to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParseMode {
    /// Identity, every subject tuple and the summary fields (default).
    #[default]
    Full,
    /// Identity and outcome only; subject columns are left empty.
    Summary,
}

/// Which pages of the PDF to read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every page (default).
    #[default]
    All,
    /// One page (1-indexed).
    Single(usize),
    /// A contiguous range (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Sorted, deduplicated 0-indexed pages that exist in a document of
    /// `total_pages`.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let in_range = |p: usize| p >= 1 && p <= total_pages;
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => in_range(*p).then(|| p - 1).into_iter().collect(),
            PageSelection::Range(start, end) => {
                ((*start).max(1) - 1..(*end).min(total_pages)).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .copied()
                .filter(|&p| in_range(p))
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// The first requested page beyond `total_pages`, if any.
    pub fn first_out_of_range(&self, total_pages: usize) -> Option<usize> {
        match self {
            PageSelection::All => None,
            PageSelection::Single(p) => (*p > total_pages || *p == 0).then_some(*p),
            PageSelection::Range(start, _) => (*start > total_pages).then_some(*start),
            PageSelection::Set(pages) => {
                pages.iter().copied().find(|&p| p > total_pages || p == 0)
            }
        }
    }
}

impl std::str::FromStr for PageSelection {
    type Err = MarksheetError;

    /// Parse `all`, `5`, `3-7` or `1,4,9`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || MarksheetError::InvalidConfig(format!("invalid page selection '{s}'"));
        let number = |t: &str| t.trim().parse::<usize>().map_err(|_| invalid());

        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }
        if s.contains(',') {
            return s.split(',').map(number).collect::<Result<_, _>>().map(PageSelection::Set);
        }
        if let Some((a, b)) = s.split_once('-') {
            let (a, b) = (number(a)?, number(b)?);
            if a == 0 || b < a {
                return Err(invalid());
            }
            return Ok(PageSelection::Range(a, b));
        }
        Ok(PageSelection::Single(number(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ParseConfig::new(Semester::I);
        assert_eq!(c.mode, ParseMode::Full);
        assert_eq!(c.pages, PageSelection::All);
        assert_eq!(c.download_timeout_secs, 120);
        assert_eq!(c.parse_timeout_secs, None);
        assert_eq!(c.reflow, ReflowOptions::default());
    }

    #[test]
    fn builder_by_name_rejects_unknown_semester() {
        assert!(ParseConfig::builder_for("VII").unwrap_err().is_config_error());
        let c = ParseConfig::builder_for("sem4").unwrap().build().unwrap();
        assert_eq!(c.semester, Semester::IV);
    }

    #[test]
    fn build_validates_thresholds() {
        assert!(ParseConfig::builder(Semester::I).line_tolerance(0.0).build().is_err());
        assert!(ParseConfig::builder(Semester::I).gap_threshold(-1.0).build().is_err());
        assert!(ParseConfig::builder(Semester::I).parse_timeout_secs(0).build().is_err());
        assert!(ParseConfig::builder(Semester::I)
            .noise_rule(NoiseRule::new("", "END"))
            .build()
            .is_err());
        assert!(ParseConfig::builder(Semester::I).gap_threshold(0.0).build().is_ok());
    }

    #[test]
    fn debug_redacts_password() {
        let c = ParseConfig::builder(Semester::I).password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(5), vec![0, 1, 2, 3, 4]);
        assert_eq!(PageSelection::Single(3).to_indices(5), vec![2]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 4).to_indices(5), vec![1, 2, 3]);
        assert_eq!(PageSelection::Set(vec![3, 1, 3]).to_indices(5), vec![0, 2]);
    }

    #[test]
    fn page_selection_out_of_range() {
        assert_eq!(PageSelection::Single(6).first_out_of_range(5), Some(6));
        assert_eq!(PageSelection::Range(2, 9).first_out_of_range(5), None);
        assert_eq!(PageSelection::Set(vec![1, 7]).first_out_of_range(5), Some(7));
        assert_eq!(PageSelection::All.first_out_of_range(0), None);
    }

    #[test]
    fn page_selection_parses() {
        assert_eq!("all".parse::<PageSelection>().unwrap(), PageSelection::All);
        assert_eq!("4".parse::<PageSelection>().unwrap(), PageSelection::Single(4));
        assert_eq!("2-5".parse::<PageSelection>().unwrap(), PageSelection::Range(2, 5));
        assert_eq!(
            "1, 3,9".parse::<PageSelection>().unwrap(),
            PageSelection::Set(vec![1, 3, 9])
        );
        assert!("5-2".parse::<PageSelection>().is_err());
        assert!("x".parse::<PageSelection>().is_err());
    }
}

//! Record grammars: one field extractor per gazette layout.
//!
//! Each semester's report template lays a student out differently, so each
//! [`Layout`] has its own [`SemesterGrammar`] implementation rather than one
//! parser full of special cases. The set is closed: [`grammar_for`] is the
//! single place that maps a semester profile to its grammar, which also
//! makes "which layouts are supported" answerable by reading one `match`.
//!
//! ```text
//! cleaned text ─▶ segment() ─▶ [Section { subjects, blocks }]
//!                                  │
//!                 per block ──▶ has_mark_tokens()? ─▶ extract(block, subjects) ─▶ RawRecord
//! ```
//!
//! Subject lists are passed *into* `extract` as values. Layouts that read a
//! subject legend from the document return one [`Section`] per legend, so no
//! mutable "current subjects" state is threaded through the loop.

pub mod grade_count;
pub mod paper_code;
pub mod pipe_column;
pub mod tokens;
pub mod whitespace_run;

use crate::config::ParseMode;
use crate::error::SkipReason;
use crate::output::SubjectTuple;
use crate::pipeline::segment::{split_blocks, StudentBlock};
use crate::semester::{Layout, SemesterProfile, SubjectSlot};
use regex::Regex;

pub use grade_count::GradeCountGrammar;
pub use paper_code::{PaperCodeGrammar, PaperCodeOffsets, PAPER_CODE_OFFSETS};
pub use pipe_column::PipeColumnGrammar;
pub use whitespace_run::WhitespaceRunGrammar;

/// Fields pulled out of one block before validation.
///
/// Strings are untrimmed and may be empty; `raw_name` may still carry the
/// leading `/` gender marker. [`crate::pipeline::assemble`] turns this into
/// a [`crate::output::StudentRecord`] or rejects it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub seat_no: String,
    pub raw_name: String,
    pub mother_name: Option<String>,
    pub prn: Option<String>,
    pub result: String,
    pub subjects: Vec<SubjectTuple>,
    pub sgpi: Option<f64>,
    pub cgpi: Option<f64>,
    pub final_grade: Option<String>,
    pub remark: Option<String>,
}

/// Blocks sharing one active subject list.
#[derive(Debug, Clone)]
pub struct Section {
    pub subjects: Vec<SubjectSlot>,
    pub blocks: Vec<StudentBlock>,
}

/// A semester layout's segmentation and extraction rules.
pub trait SemesterGrammar: Send + Sync {
    fn layout(&self) -> Layout;

    /// Multi-line anchor marking the first line of each student block.
    fn anchor(&self) -> &Regex;

    /// Subject slots used when the document itself does not name them.
    fn default_subjects(&self) -> &[SubjectSlot];

    /// Split cleaned text into sections of student blocks.
    ///
    /// The default is a single section using [`Self::default_subjects`].
    fn segment(&self, text: &str) -> Vec<Section> {
        let segmentation = split_blocks(text, self.anchor(), 0);
        vec![Section {
            subjects: self.default_subjects().to_vec(),
            blocks: segmentation.blocks,
        }]
    }

    /// Cheap pre-check: does the block contain anything that looks like
    /// subject marks? Blocks failing this are header leftovers.
    fn has_mark_tokens(&self, block: &StudentBlock) -> bool;

    /// Extract identity, subject and summary fields from one block.
    fn extract(
        &self,
        block: &StudentBlock,
        subjects: &[SubjectSlot],
    ) -> Result<RawRecord, SkipReason>;
}

/// Select the grammar for a semester profile.
///
/// [`ParseMode::Summary`] always uses the loose whitespace-run grammar.
pub fn grammar_for(profile: &SemesterProfile, mode: ParseMode) -> Box<dyn SemesterGrammar> {
    let subjects = profile.subjects.clone();
    let layout = match mode {
        ParseMode::Full => profile.layout,
        ParseMode::Summary => Layout::WhitespaceRun,
    };

    match layout {
        Layout::PipeColumn => Box::new(PipeColumnGrammar::new(subjects)),
        Layout::GradeCount => Box::new(GradeCountGrammar::new(subjects)),
        Layout::PaperCode => Box::new(PaperCodeGrammar::new(subjects)),
        Layout::WhitespaceRun => Box::new(WhitespaceRunGrammar::new(subjects)),
    }
}

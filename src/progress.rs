//! Progress-callback trait for extraction and parse events.
//!
//! Inject an [`Arc<dyn ParseProgressCallback>`] via
//! [`crate::config::ParseConfigBuilder::progress_callback`] to observe a
//! parse as it runs. The CLI uses this to drive its progress bar; a service
//! could forward the same events to a channel.
//!
//! # Example
//!
//! ```rust
//! use marksheet_parser::{ParseConfig, ParseProgressCallback, Semester};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct SkipCounter(AtomicUsize);
//!
//! impl ParseProgressCallback for SkipCounter {
//!     fn on_block_skipped(&self, _index: usize, _reason: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(SkipCounter(AtomicUsize::new(0)));
//! let config = ParseConfig::builder(Semester::V)
//!     .progress_callback(counter.clone())
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline at each stage.
///
/// Extraction events fire on the blocking thread that reads the PDF, so
/// implementations must be `Send + Sync`. Every method defaults to a no-op.
pub trait ParseProgressCallback: Send + Sync {
    /// Called once the page count is known, before any text is read.
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after each page's glyph runs are collected.
    ///
    /// * `page_num` is 1-indexed
    /// * `runs` is the number of glyph runs found on the page
    fn on_page_extracted(&self, page_num: usize, total_pages: usize, runs: usize) {
        let _ = (page_num, total_pages, runs);
    }

    /// Called once segmentation has found `blocks` candidate records.
    fn on_parse_start(&self, blocks: usize) {
        let _ = blocks;
    }

    /// Called for each block that produced no record.
    fn on_block_skipped(&self, index: usize, reason: &str) {
        let _ = (index, reason);
    }

    /// Called when every block has been attempted.
    fn on_parse_complete(&self, records: usize, apparent_blocks: usize) {
        let _ = (records, apparent_blocks);
    }
}

/// Used when no callback is configured.
pub struct NoopProgressCallback;

impl ParseProgressCallback for NoopProgressCallback {}

/// The type stored in [`crate::config::ParseConfig`].
pub type ProgressCallback = Arc<dyn ParseProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        pages: AtomicUsize,
        skipped: Mutex<Vec<(usize, String)>>,
        complete: Mutex<Option<(usize, usize)>>,
    }

    impl ParseProgressCallback for Recorder {
        fn on_page_extracted(&self, _page_num: usize, _total_pages: usize, _runs: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_block_skipped(&self, index: usize, reason: &str) {
            self.skipped.lock().unwrap().push((index, reason.to_string()));
        }

        fn on_parse_complete(&self, records: usize, apparent_blocks: usize) {
            *self.complete.lock().unwrap() = Some((records, apparent_blocks));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start(3);
        cb.on_page_extracted(1, 3, 120);
        cb.on_parse_start(40);
        cb.on_block_skipped(2, "no subject-mark tokens");
        cb.on_parse_complete(39, 40);
    }

    #[test]
    fn recorder_receives_events_through_arc() {
        let recorder = Arc::new(Recorder::default());
        let cb: ProgressCallback = recorder.clone();

        cb.on_page_extracted(1, 2, 10);
        cb.on_page_extracted(2, 2, 12);
        cb.on_block_skipped(7, "missing required field 'name'");
        cb.on_parse_complete(5, 6);

        assert_eq!(recorder.pages.load(Ordering::SeqCst), 2);
        assert_eq!(
            recorder.skipped.lock().unwrap().as_slice(),
            &[(7, "missing required field 'name'".to_string())]
        );
        assert_eq!(*recorder.complete.lock().unwrap(), Some((5, 6)));
    }
}

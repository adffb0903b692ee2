//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive events
//! as the batch driver works through the input directory. The CLI uses it to
//! draw its progress bar and per-file log lines; library users can forward the
//! events anywhere.
//!
//! # Example
//!
//! ```rust
//! use batch_ocr::{BatchConfig, BatchProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, index: usize, total: usize, name: &str) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("[{index}/{total}] {name} done");
//!     }
//! }
//!
//! let config = BatchConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::InvocationError;
use std::sync::Arc;

/// Called by the batch driver and the per-document processor.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Indices are 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after discovery, before the first document.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before the first OCR attempt of a document.
    fn on_document_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when an attempt failed and another one will follow.
    ///
    /// # Arguments
    /// * `attempt`     — 1-based number of the retry about to start
    /// * `max_retries` — configured retry limit
    /// * `error`       — why the previous attempt failed
    fn on_retry(&self, name: &str, attempt: u32, max_retries: u32, error: &InvocationError) {
        let _ = (name, attempt, max_retries, error);
    }

    /// Called when OCR and merge succeeded but the PDF could not be archived.
    fn on_archive_failed(&self, name: &str, error: &str) {
        let _ = (name, error);
    }

    /// Called when a document finished successfully.
    fn on_document_complete(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a document failed for good.
    fn on_document_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let _ = (index, total, name, error);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        retries: AtomicUsize,
        batch_total: AtomicUsize,
        batch_success: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total: usize) {
            self.batch_total.store(total, Ordering::SeqCst);
        }

        fn on_document_start(&self, _index: usize, _total: usize, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_retry(&self, _name: &str, _attempt: u32, _max: u32, _error: &InvocationError) {
            self.retries.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _index: usize, _total: usize, _name: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_error(&self, _index: usize, _total: usize, _name: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, success_count: usize) {
            self.batch_success.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_document_start(1, 2, "a.pdf");
        cb.on_retry("a.pdf", 1, 2, &InvocationError::TimedOut { secs: 1 });
        cb.on_archive_failed("a.pdf", "permission denied");
        cb.on_document_complete(1, 2, "a.pdf");
        cb.on_document_error(2, 2, "b.pdf", "boom");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(2);
        tracker.on_document_start(1, 2, "a.pdf");
        tracker.on_retry("a.pdf", 1, 2, &InvocationError::TimedOut { secs: 1 });
        tracker.on_document_complete(1, 2, "a.pdf");
        tracker.on_document_start(2, 2, "b.pdf");
        tracker.on_document_error(2, 2, "b.pdf", "merge failed");
        tracker.on_batch_complete(2, 1);

        assert_eq!(tracker.batch_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.retries.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.batch_success.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10);
        cb.on_document_start(1, 10, "scan.pdf");
    }
}

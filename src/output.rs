//! Result types produced by a batch run.

use crate::config::OutputFormat;
use crate::error::DocumentError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Maximum number of characters of an error line shown in the summary.
pub const SUMMARY_REASON_CHARS: usize = 100;

/// Outcome of processing a single PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentOutcome {
    /// Source PDF path as discovered.
    pub path: PathBuf,
    /// File name of the source PDF.
    pub name: String,
    /// OCR invocations made (1 + retries consumed).
    pub attempts: u32,
    /// Wall-clock time spent on the document.
    pub duration_ms: u64,
    /// The merged `<stem>.<format>` file, when the merge succeeded.
    pub merged_path: Option<PathBuf>,
    /// Where the PDF was moved to, when archiving succeeded.
    pub archived_path: Option<PathBuf>,
    /// Archive failure message. Does not make the document a failure.
    pub archive_error: Option<String>,
    /// Set when the document failed.
    pub error: Option<DocumentError>,
}

impl DocumentOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate counts for a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_duration_ms: u64,
}

/// Everything a batch run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub stats: BatchStats,
    pub documents: Vec<DocumentOutcome>,
}

impl BatchReport {
    /// Build a report; the stats are derived from `documents`.
    pub fn new(
        input_dir: PathBuf,
        output_dir: PathBuf,
        format: OutputFormat,
        documents: Vec<DocumentOutcome>,
        total_duration_ms: u64,
    ) -> Self {
        let failed = documents.iter().filter(|d| !d.is_success()).count();
        let stats = BatchStats {
            total: documents.len(),
            succeeded: documents.len() - failed,
            failed,
            total_duration_ms,
        };
        Self {
            input_dir,
            output_dir,
            format,
            stats,
            documents,
        }
    }

    /// Documents that failed, in processing order.
    pub fn failures(&self) -> impl Iterator<Item = (&DocumentOutcome, &DocumentError)> {
        self.documents
            .iter()
            .filter_map(|d| d.error.as_ref().map(|e| (d, e)))
    }

    pub fn all_succeeded(&self) -> bool {
        self.stats.failed == 0
    }

    /// Process exit status: 0 when every document succeeded, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.all_succeeded() {
            0
        } else {
            1
        }
    }
}

/// First line of an error message, cut to [`SUMMARY_REASON_CHARS`] characters.
pub fn summarize_error(message: &str) -> String {
    message
        .split('\n')
        .next()
        .unwrap_or("")
        .chars()
        .take(SUMMARY_REASON_CHARS)
        .collect()
}

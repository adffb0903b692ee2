//! Error types for the batch-ocr library.
//!
//! Failures fall into four groups, each with its own type:
//!
//! * [`BatchError`] — **Fatal**: the batch cannot start at all (missing input
//!   directory, no PDFs, output directory not creatable). Returned as
//!   `Err(BatchError)` from [`crate::batch::run_batch`].
//!
//! * [`InvocationError`] — one OCR attempt failed (non-zero exit, timeout,
//!   launch failure). Retried by the per-document processor.
//!
//! * [`MergeError`] / [`ArchiveError`] — a post-OCR stage failed. A merge
//!   failure ends the document; an archive failure is only a warning.
//!
//! * [`DocumentError`] — the terminal, typed failure of one document. Stored
//!   inside [`crate::output::DocumentOutcome`] rather than propagated, so one
//!   bad PDF never aborts the rest of the batch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the batch driver.
#[derive(Debug, Error)]
pub enum BatchError {
    // ── Pre-flight errors ─────────────────────────────────────────────────
    /// The input directory does not exist.
    #[error("Input directory not found: '{path}'")]
    InputDirNotFound { path: PathBuf },

    /// The input directory exists but could not be listed.
    #[error("Failed to read input directory '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input directory contains no PDF files.
    #[error("No PDF files found in '{path}'")]
    NoPdfFiles { path: PathBuf },

    /// Could not create the output directory.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a single OCR tool invocation.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The tool ran and exited unsuccessfully. `message` is the captured
    /// stderr, or stdout when stderr was empty.
    #[error("{message}")]
    Failed { code: Option<i32>, message: String },

    /// The tool did not finish within the configured timeout and was killed.
    #[error("OCR processing timed out after {secs}s")]
    TimedOut { secs: u64 },

    /// The tool could not be started at all.
    #[error("Failed to launch OCR tool '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while waiting on the tool.
    #[error("OCR tool I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InvocationError {
    /// Short label used in retry log lines.
    pub fn label(&self) -> &'static str {
        match self {
            InvocationError::Failed { .. } => "non-zero exit",
            InvocationError::TimedOut { .. } => "timeout",
            InvocationError::Spawn { .. } | InvocationError::Io(_) => "error",
        }
    }
}

/// Failure of the fragment merge stage.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The OCR tool reported success but left no matching fragments.
    #[error("no generated files found matching '{pattern}'")]
    NoFragments { pattern: String },

    /// The output directory could not be listed.
    #[error("failed to list '{path}': {source}")]
    ListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A fragment could not be read as UTF-8 text.
    #[error("failed to read fragment '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The merged artifact could not be written.
    #[error("failed to write merged file '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A consumed fragment could not be deleted.
    #[error("failed to remove fragment '{path}': {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The PDF path has no usable file stem.
    #[error("cannot derive a file stem from '{path}'")]
    NoStem { path: PathBuf },

    /// The fragment pattern could not be compiled.
    #[error("invalid fragment pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Failure to move a processed PDF into the archive directory.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to create archive directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to move '{from}' to '{to}': {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' has no file name")]
    NoFileName { path: PathBuf },
}

/// Category of a terminal per-document failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentErrorKind {
    /// The OCR tool failed on every attempt.
    InvocationFailed,
    /// The last attempt hit the timeout.
    TimedOut,
    /// OCR succeeded but its fragments could not be merged.
    MergeFailed,
    /// The retry loop ended without a decision.
    Unknown,
}

impl fmt::Display for DocumentErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentErrorKind::InvocationFailed => "invocation failed",
            DocumentErrorKind::TimedOut => "timed out",
            DocumentErrorKind::MergeFailed => "merge failed",
            DocumentErrorKind::Unknown => "unknown error",
        };
        f.write_str(s)
    }
}

/// A non-fatal error for a single document.
///
/// Stored in [`crate::output::DocumentOutcome`]. The batch continues with the
/// next document regardless.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{detail}")]
pub struct DocumentError {
    pub kind: DocumentErrorKind,
    pub detail: String,
}

impl DocumentError {
    pub fn new(kind: DocumentErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// A merge failure after a successful OCR run.
    pub fn merge_failed(source: &MergeError) -> Self {
        Self::new(DocumentErrorKind::MergeFailed, format!("merge failed: {source}"))
    }

    /// The retry loop fell through without returning.
    pub fn unknown() -> Self {
        Self::new(DocumentErrorKind::Unknown, "unknown error")
    }
}

impl From<InvocationError> for DocumentError {
    fn from(e: InvocationError) -> Self {
        let kind = match e {
            InvocationError::TimedOut { .. } => DocumentErrorKind::TimedOut,
            _ => DocumentErrorKind::InvocationFailed,
        };
        Self::new(kind, e.to_string())
    }
}

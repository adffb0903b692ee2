//! # batch-ocr
//!
//! Run an external OCR command-line tool over a directory of PDFs and turn
//! its per-page output into one file per document.
//!
//! OCR tools such as `yomitoku` write one fragment per page
//! (`scan_p1.md`, `scan_p2.md`, …). This crate drives the tool for every PDF
//! in a directory, retries failed or hung runs, merges the fragments in page
//! order (numerically, so `_p10` follows `_p2`) and moves finished PDFs out of
//! the input directory.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input_files/*.pdf
//!  │
//!  ├─ 1. Discover  list *.pdf, sorted by name
//!  ├─ 2. OCR       <tool> <pdf> -f <format> -o <output>  (timeout, retries)
//!  ├─ 3. Merge     fragments → <stem>.<format>  (CSV header de-duplication)
//!  ├─ 4. Archive   move the PDF to processed_files/
//!  └─ 5. Report    per-document outcomes + exit status
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use batch_ocr::{run_batch, BatchConfig, OutputFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchConfig::builder()
//!         .input_dir("input_files")
//!         .format(OutputFormat::Md)
//!         .build()?;
//!     let report = run_batch(&config).await?;
//!     eprintln!("{}/{} succeeded", report.stats.succeeded, report.stats.total);
//!     std::process::exit(report.exit_code().into());
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `batch-ocr` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{list_documents, run_batch, run_batch_sync};
pub use config::{BatchConfig, BatchConfigBuilder, OutputFormat};
pub use error::{
    ArchiveError, BatchError, DocumentError, DocumentErrorKind, InvocationError, MergeError,
};
pub use output::{summarize_error, BatchReport, BatchStats, DocumentOutcome};
pub use pipeline::ocr::{ExternalOcrTool, OcrEngine};
pub use process::process_document;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};

//! Batch entry points: process every PDF in the input directory.
//!
//! Documents are processed strictly one after another. Each one is fully
//! OCR'd, merged and archived before the next begins, so the output directory
//! is the only thing shared between documents and their file names never
//! collide.

use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::output::BatchReport;
use crate::pipeline::discover;
use crate::process::{process_document, resolve_engine};
use std::path::PathBuf;
use std::time::Instant;
use tokio::fs;
use tracing::{debug, info, warn};

/// Run the whole batch described by `config`.
///
/// # Returns
/// `Ok(BatchReport)` once every document has been attempted, even if some
/// failed (check `report.stats.failed` or [`BatchReport::exit_code`]).
///
/// # Errors
/// Returns `Err(BatchError)` only for fatal pre-flight errors:
/// - input directory missing or unreadable
/// - output directory cannot be created
/// - no PDF files in the input directory
pub async fn run_batch(config: &BatchConfig) -> Result<BatchReport, BatchError> {
    let total_start = Instant::now();
    if !fs::try_exists(&config.input_dir).await.unwrap_or(false) {
        return Err(BatchError::InputDirNotFound {
            path: config.input_dir.clone(),
        });
    }
    fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|source| BatchError::OutputDirCreate {
            path: config.output_dir.clone(),
            source,
        })?;

    let documents = list_documents(config).await?;
    let total = documents.len();
    info!(
        "Processing {} PDFs from {} as {}",
        total,
        config.input_dir.display(),
        config.format
    );

    let engine = resolve_engine(config);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut outcomes = Vec::with_capacity(total);
    for (i, pdf_path) in documents.iter().enumerate() {
        let index = i + 1;
        let name = pdf_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Some(ref cb) = config.progress_callback {
            cb.on_document_start(index, total, &name);
        }

        let outcome = process_document(pdf_path, &engine, config).await;

        if let Some(ref cb) = config.progress_callback {
            match &outcome.error {
                None => cb.on_document_complete(index, total, &name),
                Some(e) => cb.on_document_error(index, total, &name, &e.to_string()),
            }
        }
        match &outcome.error {
            None => debug!("[{}/{}] {} succeeded", index, total, name),
            Some(e) => warn!("[{}/{}] {} failed ({}): {}", index, total, name, e.kind, e),
        }

        outcomes.push(outcome);
    }

    let report = BatchReport::new(
        config.input_dir.clone(),
        config.output_dir.clone(),
        config.format,
        outcomes,
        total_start.elapsed().as_millis() as u64,
    );

    info!(
        "Batch complete: {}/{} succeeded, {}ms total",
        report.stats.succeeded, report.stats.total, report.stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(report.stats.total, report.stats.succeeded);
    }

    Ok(report)
}

/// Synchronous wrapper around [`run_batch`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_batch_sync(config: &BatchConfig) -> Result<BatchReport, BatchError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BatchError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run_batch(config))
}

/// Return the PDFs a batch would process, in processing order.
///
/// Read-only: neither the output directory nor the OCR tool is touched.
pub async fn list_documents(config: &BatchConfig) -> Result<Vec<PathBuf>, BatchError> {
    let documents = discover::find_pdf_files(&config.input_dir).await?;
    if documents.is_empty() {
        return Err(BatchError::NoPdfFiles {
            path: config.input_dir.clone(),
        });
    }
    Ok(documents)
}

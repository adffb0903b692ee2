//! Per-document processing: OCR with retries, then merge, then archive.
//!
//! ## Retry Strategy
//!
//! An OCR attempt can fail three ways: the tool exits non-zero, it exceeds
//! the timeout, or it cannot be run at all. All three are retried immediately,
//! up to `max_retries` times. Once an attempt succeeds the remaining steps run
//! exactly once:
//!
//! * a merge failure ends the document (re-running OCR would not fix a
//!   fragment-matching problem);
//! * an archive failure is logged and reported, but the document still counts
//!   as a success because its output is complete.

use crate::config::BatchConfig;
use crate::error::DocumentError;
use crate::output::DocumentOutcome;
use crate::pipeline::ocr::{ExternalOcrTool, OcrEngine};
use crate::pipeline::{archive, merge};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// OCR a single PDF and produce its merged artifact.
///
/// Always returns a [`DocumentOutcome`]; failures are recorded in
/// `outcome.error` and never propagated, so one bad PDF doesn't abort the
/// batch.
pub async fn process_document(
    pdf_path: &Path,
    engine: &Arc<dyn OcrEngine>,
    config: &BatchConfig,
) -> DocumentOutcome {
    let start = Instant::now();
    let name = display_name(pdf_path);
    let mut outcome = DocumentOutcome {
        path: pdf_path.to_path_buf(),
        name: name.clone(),
        attempts: 0,
        duration_ms: 0,
        merged_path: None,
        archived_path: None,
        archive_error: None,
        error: None,
    };

    for attempt in 0..=config.max_retries {
        outcome.attempts = attempt + 1;

        if config.clear_stale_fragments {
            clear_stale_fragments(pdf_path, config).await;
        }

        match engine
            .run(pdf_path, config.format, &config.output_dir)
            .await
        {
            Ok(()) => {
                debug!("{}: OCR succeeded on attempt {}", name, attempt + 1);
                finish(&mut outcome, config).await;
                outcome.duration_ms = start.elapsed().as_millis() as u64;
                return outcome;
            }
            Err(e) if attempt < config.max_retries => {
                warn!(
                    "{}: {}, retry {}/{}: {}",
                    name,
                    e.label(),
                    attempt + 1,
                    config.max_retries,
                    e
                );
                if let Some(ref cb) = config.progress_callback {
                    cb.on_retry(&name, attempt + 1, config.max_retries, &e);
                }
            }
            Err(e) => {
                error!("{}: giving up after {} attempts: {}", name, attempt + 1, e);
                outcome.error = Some(DocumentError::from(e));
                outcome.duration_ms = start.elapsed().as_millis() as u64;
                return outcome;
            }
        }
    }

    outcome.error = Some(DocumentError::unknown());
    outcome.duration_ms = start.elapsed().as_millis() as u64;
    outcome
}

/// Resolve the engine: the injected one, or the configured external tool.
pub fn resolve_engine(config: &BatchConfig) -> Arc<dyn OcrEngine> {
    match config.engine {
        Some(ref engine) => Arc::clone(engine),
        None => Arc::new(ExternalOcrTool::from_config(config)),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Merge and archive after a successful OCR run.
async fn finish(outcome: &mut DocumentOutcome, config: &BatchConfig) {
    let merged =
        match merge::merge_fragments(&outcome.path, &config.output_dir, config.format).await {
            Ok(path) => path,
            Err(e) => {
                error!("{}: merge failed: {}", outcome.name, e);
                outcome.error = Some(DocumentError::merge_failed(&e));
                return;
            }
        };
    outcome.merged_path = Some(merged);

    match archive::move_processed_file(&outcome.path, &config.processed_dir).await {
        Ok(dest) => outcome.archived_path = Some(dest),
        Err(e) => {
            warn!(
                "{}: could not archive PDF, OCR output is complete: {}",
                outcome.name, e
            );
            let msg = e.to_string();
            if let Some(ref cb) = config.progress_callback {
                cb.on_archive_failed(&outcome.name, &msg);
            }
            outcome.archive_error = Some(msg);
        }
    }

    info!("{}: done", outcome.name);
}

async fn clear_stale_fragments(pdf_path: &Path, config: &BatchConfig) {
    match merge::remove_fragments(pdf_path, &config.output_dir, config.format).await {
        Ok(0) => {}
        Ok(n) => debug!("Removed {} stale fragments for {}", n, pdf_path.display()),
        Err(e) => warn!(
            "Could not clear stale fragments for {}: {}",
            pdf_path.display(),
            e
        ),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvocationError;

    #[test]
    fn display_name_uses_file_name() {
        assert_eq!(display_name(Path::new("input_files/scan.pdf")), "scan.pdf");
        assert_eq!(display_name(Path::new("/")), "/");
    }

    #[test]
    fn resolve_engine_prefers_injected() {
        struct Never;
        #[async_trait::async_trait]
        impl OcrEngine for Never {
            async fn run(
                &self,
                _: &Path,
                _: crate::config::OutputFormat,
                _: &Path,
            ) -> Result<(), InvocationError> {
                unreachable!()
            }
        }

        let injected: Arc<dyn OcrEngine> = Arc::new(Never);
        let config = BatchConfig::builder()
            .engine(Arc::clone(&injected))
            .build()
            .unwrap();
        let resolved = resolve_engine(&config);
        assert!(Arc::ptr_eq(&resolved, &injected));
    }
}

//! OCR invocation: run the external tool on one PDF.
//!
//! The tool is called as
//!
//! ```text
//! <tool> [tool-args…] <pdf-path> -f <format> -o <output-dir>
//! ```
//!
//! and is expected to write one fragment per page into the output directory.
//! It signals failure through its exit status, with diagnostics on stderr
//! (or stdout for tools that log there).
//!
//! [`OcrEngine`] is the seam between the per-document processor and the
//! subprocess. [`ExternalOcrTool`] is the production implementation; tests and
//! embedders can pass their own through
//! [`crate::config::BatchConfigBuilder::engine`].

use crate::config::{BatchConfig, OutputFormat};
use crate::error::InvocationError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Something that can OCR a PDF into per-page fragments.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// OCR `pdf_path`, writing `format` fragments into `output_dir`.
    ///
    /// One call is one attempt; retries are the caller's business.
    async fn run(
        &self,
        pdf_path: &Path,
        format: OutputFormat,
        output_dir: &Path,
    ) -> Result<(), InvocationError>;
}

/// Runs an OCR command-line tool as a subprocess with a hard timeout.
#[derive(Debug, Clone)]
pub struct ExternalOcrTool {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalOcrTool {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Build from the `tool`, `tool_args` and `timeout_secs` settings.
    pub fn from_config(config: &BatchConfig) -> Self {
        Self::new(config.tool.clone(), config.tool_args.clone(), config.timeout())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, pdf_path: &Path, format: OutputFormat, output_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(pdf_path)
            .arg("-f")
            .arg(format.extension())
            .arg("-o")
            .arg(output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on timeout kills the child.
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl OcrEngine for ExternalOcrTool {
    async fn run(
        &self,
        pdf_path: &Path,
        format: OutputFormat,
        output_dir: &Path,
    ) -> Result<(), InvocationError> {
        debug!(
            "Running {} on {} (format {}, timeout {:?})",
            self.program,
            pdf_path.display(),
            format,
            self.timeout
        );

        let child = self
            .command(pdf_path, format, output_dir)
            .spawn()
            .map_err(|source| InvocationError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(InvocationError::Io(e)),
            Err(_) => {
                return Err(InvocationError::TimedOut {
                    secs: self.timeout.as_secs(),
                })
            }
        };

        if output.status.success() {
            debug!("{} finished for {}", self.program, pdf_path.display());
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let message = if !stderr.is_empty() {
            stderr.into_owned()
        } else if !stdout.is_empty() {
            stdout.into_owned()
        } else {
            format!("{} exited with {}", self.program, output.status)
        };

        Err(InvocationError::Failed {
            code: output.status.code(),
            message,
        })
    }
}

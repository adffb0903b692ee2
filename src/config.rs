//! Configuration types for a batch OCR run.
//!
//! All batch behaviour is controlled through [`BatchConfig`], built via its
//! [`BatchConfigBuilder`]. Defaults mirror the CLI defaults: `input_files/`
//! in, `output/` out, `processed_files/` for archived PDFs, Markdown output,
//! two retries and a ten-minute timeout per OCR invocation.

use crate::error::BatchError;
use crate::pipeline::ocr::OcrEngine;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Default external OCR executable.
pub const DEFAULT_TOOL: &str = "yomitoku";

/// Default per-invocation timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Configuration for a batch OCR run.
///
/// # Example
/// ```rust
/// use batch_ocr::{BatchConfig, OutputFormat};
///
/// let config = BatchConfig::builder()
///     .input_dir("scans")
///     .format(OutputFormat::Csv)
///     .max_retries(1)
///     .build()
///     .unwrap();
/// assert_eq!(config.format, OutputFormat::Csv);
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Directory scanned (non-recursively) for `*.pdf`. Default: `input_files`.
    pub input_dir: PathBuf,

    /// Directory receiving fragments and merged artifacts. Default: `output`.
    pub output_dir: PathBuf,

    /// Directory successfully processed PDFs are moved into. Default: `processed_files`.
    pub processed_dir: PathBuf,

    /// Output format requested from the OCR tool. Default: [`OutputFormat::Md`].
    pub format: OutputFormat,

    /// Retries after the first failed attempt. Default: 2 (three attempts total).
    ///
    /// Retries are immediate. Only invocation failures are retried; a merge
    /// failure after a successful run ends the document.
    pub max_retries: u32,

    /// Hard timeout per OCR invocation in seconds. Default: 600.
    pub timeout_secs: u64,

    /// OCR executable. Default: `yomitoku`.
    pub tool: String,

    /// Extra arguments placed between the executable and the PDF path.
    pub tool_args: Vec<String>,

    /// Delete fragments matching the document before every attempt. Default: false.
    ///
    /// When false, fragments left by a failed attempt are picked up by a
    /// later successful attempt's merge and may duplicate pages.
    pub clear_stale_fragments: bool,

    /// Pre-constructed OCR engine. Takes precedence over `tool`/`tool_args`.
    pub engine: Option<Arc<dyn OcrEngine>>,

    /// Receives per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input_files"),
            output_dir: PathBuf::from("output"),
            processed_dir: PathBuf::from("processed_files"),
            format: OutputFormat::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            tool: DEFAULT_TOOL.to_string(),
            tool_args: Vec::new(),
            clear_stale_fragments: false,
            engine: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("processed_dir", &self.processed_dir)
            .field("format", &self.format)
            .field("max_retries", &self.max_retries)
            .field("timeout_secs", &self.timeout_secs)
            .field("tool", &self.tool)
            .field("tool_args", &self.tool_args)
            .field("clear_stale_fragments", &self.clear_stale_fragments)
            .field("engine", &self.engine.as_ref().map(|_| "<dyn OcrEngine>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }

    /// The invocation timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Builder for [`BatchConfig`].
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl fmt::Debug for BatchConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl BatchConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn processed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.processed_dir = dir.into();
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.config.tool = tool.into();
        self
    }

    pub fn tool_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.tool_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn clear_stale_fragments(mut self, v: bool) -> Self {
        self.config.clear_stale_fragments = v;
        self
    }

    pub fn engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, BatchError> {
        let c = &self.config;
        if c.timeout_secs == 0 {
            return Err(BatchError::InvalidConfig(
                "Timeout must be at least 1 second".into(),
            ));
        }
        if c.engine.is_none() && c.tool.trim().is_empty() {
            return Err(BatchError::InvalidConfig(
                "OCR tool must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Output format requested from the OCR tool.
///
/// The value doubles as the file extension of every fragment and of the
/// merged artifact. CSV is merged line-wise with header de-duplication and
/// written with a UTF-8 BOM; the others are concatenated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown (default).
    #[default]
    Md,
    Json,
    Html,
    Csv,
}

impl OutputFormat {
    /// Every supported format, in CLI order.
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Md,
        OutputFormat::Json,
        OutputFormat::Html,
        OutputFormat::Csv,
    ];

    /// File extension and `-f` argument value.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Md => "md",
            OutputFormat::Json => "json",
            OutputFormat::Html => "html",
            OutputFormat::Csv => "csv",
        }
    }

    /// Whether the merged file starts with a UTF-8 byte-order mark.
    pub fn writes_bom(self) -> bool {
        matches!(self, OutputFormat::Csv)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        OutputFormat::ALL
            .into_iter()
            .find(|f| f.extension() == lower)
            .ok_or_else(|| {
                BatchError::InvalidConfig(format!(
                    "Unknown output format '{s}' (expected md, json, html or csv)"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli() {
        let c = BatchConfig::default();
        assert_eq!(c.input_dir, PathBuf::from("input_files"));
        assert_eq!(c.output_dir, PathBuf::from("output"));
        assert_eq!(c.processed_dir, PathBuf::from("processed_files"));
        assert_eq!(c.format, OutputFormat::Md);
        assert_eq!(c.max_retries, 2);
        assert_eq!(c.timeout(), Duration::from_secs(600));
        assert_eq!(c.tool, "yomitoku");
        assert!(!c.clear_stale_fragments);
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        let err = BatchConfig::builder().timeout_secs(0).build().unwrap_err();
        assert!(matches!(err, BatchError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_empty_tool() {
        assert!(BatchConfig::builder().tool("  ").build().is_err());
    }

    #[test]
    fn builder_sets_tool_args() {
        let c = BatchConfig::builder()
            .tool("python3")
            .tool_args(["-m", "yomitoku"])
            .build()
            .unwrap();
        assert_eq!(c.tool_args, vec!["-m".to_string(), "yomitoku".to_string()]);
    }

    #[test]
    fn format_parse_and_display() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("html".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert!("pdf".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn only_csv_writes_bom() {
        assert!(OutputFormat::Csv.writes_bom());
        assert!(!OutputFormat::Md.writes_bom());
        assert!(!OutputFormat::Html.writes_bom());
    }

    #[test]
    fn debug_elides_engine() {
        let dbg = format!("{:?}", BatchConfig::default());
        assert!(dbg.contains("yomitoku"));
        assert!(dbg.contains("engine: None"));
    }
}

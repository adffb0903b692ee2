//! CLI binary for batch-ocr.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`,
//! renders progress and prints the final summary.

use anyhow::{Context, Result};
use batch_ocr::{
    list_documents, run_batch, summarize_error, BatchConfig, BatchError, BatchProgressCallback,
    BatchReport, InvocationError, OutputFormat, ProgressCallback,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const RULE: &str = "────────────────────────────────────────────────────────────";

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a progress bar over documents plus one log
/// line per document, retry and archive warning.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the document currently being processed.
    started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new(show_bar: bool) -> Arc<Self> {
        let bar = if show_bar {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("OCR");
        if show_bar {
            bar.enable_steady_tick(Duration::from_millis(80));
        }

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
        })
    }

    /// Print above the bar, or straight to stderr when the bar is hidden.
    fn line(&self, msg: String) {
        if self.bar.is_hidden() {
            eprintln!("{msg}");
        } else {
            self.bar.println(msg);
        }
    }

    fn elapsed(&self) -> String {
        let secs = self
            .started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.reset_eta();
    }

    fn on_document_start(&self, index: usize, total: usize, name: &str) {
        if let Ok(mut s) = self.started.lock() {
            *s = Some(Instant::now());
        }
        self.bar.set_message(name.to_string());
        self.line(format!(
            "{} processing: {}",
            dim(&format!("[{index}/{total}]")),
            name
        ));
    }

    fn on_retry(&self, name: &str, attempt: u32, max_retries: u32, error: &InvocationError) {
        self.line(format!(
            "  {} {} - retry {}/{}: {}",
            yellow("⚠"),
            error.label(),
            attempt,
            max_retries,
            name
        ));
    }

    fn on_archive_failed(&self, name: &str, error: &str) {
        self.line(format!(
            "  {} could not move {} to the processed directory; OCR output is complete ({})",
            yellow("⚠"),
            name,
            dim(&summarize_error(error))
        ));
    }

    fn on_document_complete(&self, _index: usize, _total: usize, name: &str) {
        let elapsed = self.elapsed();
        self.line(format!("  {} done: {}  {}", green("✓"), name, elapsed));
        self.bar.inc(1);
    }

    fn on_document_error(&self, _index: usize, _total: usize, name: &str, _error: &str) {
        let elapsed = self.elapsed();
        self.line(format!("  {} failed: {}  {}", red("✗"), red(name), elapsed));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _total: usize, _success_count: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR every PDF in input_files/ to Markdown in output/
  batch-ocr

  # CSV output, custom directories
  batch-ocr -f csv -i scans -o results -p done

  # Pass extra options through to the OCR tool
  batch-ocr --tool-arg=--device --tool-arg=cpu

  # List what would be processed
  batch-ocr --dry-run

  # Machine-readable report
  batch-ocr --json > report.json

OUTPUT:
  The OCR tool writes one file per page (<stem>_p1.md, <stem>_p2.md, ...).
  They are merged in page order into <stem>.<format> and removed. CSV pages
  share a single header row and the merged file is written with a UTF-8 BOM.
  Successfully processed PDFs are moved to the processed directory; failed
  ones stay in the input directory.

EXIT STATUS:
  0  every PDF was processed
  1  input directory missing, no PDFs found, or at least one PDF failed
"#;

/// OCR every PDF in a directory with an external tool and merge its per-page output.
#[derive(Parser, Debug)]
#[command(
    name = "batch-ocr",
    version,
    about = "OCR every PDF in a directory and merge the per-page output",
    long_about = "Run an external OCR tool (yomitoku by default) on every PDF in the input \
directory, merge the per-page output files into one file per document, and move processed PDFs \
to an archive directory.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Output format.
    #[arg(short, long, env = "BATCH_OCR_FORMAT", value_enum, default_value = "md")]
    format: FormatArg,

    /// Input directory containing the PDFs.
    #[arg(short, long, env = "BATCH_OCR_INPUT", default_value = "input_files")]
    input: PathBuf,

    /// Output directory for merged files.
    #[arg(short, long, env = "BATCH_OCR_OUTPUT", default_value = "output")]
    output: PathBuf,

    /// Directory processed PDFs are moved to.
    #[arg(short, long, env = "BATCH_OCR_PROCESSED", default_value = "processed_files")]
    processed: PathBuf,

    /// OCR executable.
    #[arg(long, env = "BATCH_OCR_TOOL", default_value = batch_ocr::config::DEFAULT_TOOL)]
    tool: String,

    /// Extra argument passed to the OCR tool before the PDF path (repeatable).
    #[arg(long = "tool-arg", value_name = "ARG", allow_hyphen_values = true)]
    tool_args: Vec<String>,

    /// Per-PDF OCR timeout in seconds.
    #[arg(long, env = "BATCH_OCR_TIMEOUT", default_value_t = batch_ocr::config::DEFAULT_TIMEOUT_SECS,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Retries per PDF after a failed or timed-out OCR run.
    #[arg(long, env = "BATCH_OCR_MAX_RETRIES", default_value_t = batch_ocr::config::DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    /// Delete a PDF's leftover page files before each OCR attempt.
    #[arg(long, env = "BATCH_OCR_CLEAR_STALE")]
    clear_stale_fragments: bool,

    /// List the PDFs that would be processed and exit.
    #[arg(long)]
    dry_run: bool,

    /// Print the batch report as JSON on stdout.
    #[arg(long, env = "BATCH_OCR_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "BATCH_OCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BATCH_OCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BATCH_OCR_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Md,
    Json,
    Html,
    Csv,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Md => OutputFormat::Md,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Html => OutputFormat::Html,
            FormatArg::Csv => OutputFormat::Csv,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library logs stay at error level while the progress bar is drawn.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if cli.quiet || cli.json {
        None
    } else {
        Some(CliProgressCallback::new(show_progress) as Arc<dyn BatchProgressCallback>)
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Dry run ──────────────────────────────────────────────────────────
    if cli.dry_run {
        return match list_documents(&config).await {
            Ok(docs) => {
                for doc in &docs {
                    println!("{}", doc.display());
                }
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => Ok(fatal(&e)),
        };
    }

    if !cli.quiet && !cli.json {
        eprintln!("{} input:  {}", cyan("◆"), config.input_dir.display());
        eprintln!("{} output: {}", cyan("◆"), config.output_dir.display());
        eprintln!("{} format: {}", cyan("◆"), config.format);
    }

    // ── Run batch ────────────────────────────────────────────────────────
    let report = match run_batch(&config).await {
        Ok(report) => report,
        Err(e) => return Ok(fatal(&e)),
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report);
    }

    Ok(ExitCode::from(report.exit_code()))
}

/// Map CLI args to `BatchConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BatchConfig> {
    let mut builder = BatchConfig::builder()
        .input_dir(&cli.input)
        .output_dir(&cli.output)
        .processed_dir(&cli.processed)
        .format(cli.format.into())
        .tool(&cli.tool)
        .tool_args(cli.tool_args.iter().cloned())
        .timeout_secs(cli.timeout)
        .max_retries(cli.max_retries)
        .clear_stale_fragments(cli.clear_stale_fragments);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Report a pre-flight error and return the failure exit status.
fn fatal(e: &BatchError) -> ExitCode {
    eprintln!("{} {}", red("✘ error:"), e);
    ExitCode::FAILURE
}

fn print_summary(report: &BatchReport) {
    let stats = &report.stats;
    eprintln!("{}", dim(RULE));
    eprintln!(
        "{} {}/{} files processed  {}",
        if stats.failed == 0 {
            green("✔")
        } else {
            yellow("⚠")
        },
        bold(&stats.succeeded.to_string()),
        stats.total,
        dim(&format!("{}ms", stats.total_duration_ms)),
    );

    if stats.failed == 0 {
        eprintln!("  all files processed successfully");
        return;
    }

    eprintln!("  {} failed", red(&stats.failed.to_string()));
    eprintln!();
    eprintln!("{}", red("Files that could not be processed:"));
    for (doc, err) in report.failures() {
        eprintln!("  - {}", doc.name);
        let reason = summarize_error(&err.detail);
        if !reason.is_empty() {
            eprintln!("    reason: {}", reason);
        }
    }
}

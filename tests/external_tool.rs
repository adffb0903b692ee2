//! Integration tests for the subprocess path, using a shell script that
//! behaves like an OCR tool: it writes one fragment per page and signals
//! failure through its exit status.
//!
//! The script is run as `sh <script> …` so the test never has to mark a
//! freshly written file executable.

#![cfg(unix)]

use batch_ocr::{
    run_batch, BatchConfig, DocumentErrorKind, ExternalOcrTool, InvocationError, OcrEngine,
    OutputFormat,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

const FAKE_TOOL: &str = r#"
pdf="$1"; fmt="$3"; out="$5"
name=$(basename "$pdf" .pdf)
case "$name" in
  fail*)   echo "boom: $name" >&2; exit 3 ;;
  stdout*) echo "logged to stdout"; exit 4 ;;
  quiet*)  exit 5 ;;
  slow*)   exec sleep 30 ;;
esac
printf 'page one' > "$out/${name}_p1.$fmt"
printf 'page two' > "$out/${name}_p2.$fmt"
"#;

fn write_tool(dir: &Path) -> PathBuf {
    let script = dir.join("fake_ocr.sh");
    std::fs::write(&script, FAKE_TOOL).unwrap();
    script
}

fn tool(script: &Path, timeout: Duration) -> ExternalOcrTool {
    ExternalOcrTool::new("sh", vec![script.display().to_string()], timeout)
}

fn pdf(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"%PDF-1.7").unwrap();
    path
}

// ── ExternalOcrTool ──────────────────────────────────────────────────────────

#[tokio::test]
async fn successful_run_writes_fragments() {
    let tmp = TempDir::new().unwrap();
    let script = write_tool(tmp.path());
    let doc = pdf(tmp.path(), "scan.pdf");

    tool(&script, Duration::from_secs(30))
        .run(&doc, OutputFormat::Md, tmp.path())
        .await
        .unwrap();

    assert!(tmp.path().join("scan_p1.md").exists());
    assert!(tmp.path().join("scan_p2.md").exists());
}

#[tokio::test]
async fn non_zero_exit_reports_stderr() {
    let tmp = TempDir::new().unwrap();
    let script = write_tool(tmp.path());
    let doc = pdf(tmp.path(), "fail.pdf");

    let err = tool(&script, Duration::from_secs(30))
        .run(&doc, OutputFormat::Md, tmp.path())
        .await
        .unwrap_err();

    match err {
        InvocationError::Failed { code, message } => {
            assert_eq!(code, Some(3));
            assert_eq!(message.trim(), "boom: fail");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn non_zero_exit_falls_back_to_stdout() {
    let tmp = TempDir::new().unwrap();
    let script = write_tool(tmp.path());
    let doc = pdf(tmp.path(), "stdout.pdf");

    let err = tool(&script, Duration::from_secs(30))
        .run(&doc, OutputFormat::Md, tmp.path())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("logged to stdout"), "got: {err}");
}

#[tokio::test]
async fn silent_failure_reports_exit_status() {
    let tmp = TempDir::new().unwrap();
    let script = write_tool(tmp.path());
    let doc = pdf(tmp.path(), "quiet.pdf");

    let err = tool(&script, Duration::from_secs(30))
        .run(&doc, OutputFormat::Md, tmp.path())
        .await
        .unwrap_err();

    assert!(matches!(err, InvocationError::Failed { code: Some(5), .. }));
    assert!(err.to_string().contains("sh exited with"), "got: {err}");
}

#[tokio::test]
async fn hung_tool_is_killed_at_timeout() {
    let tmp = TempDir::new().unwrap();
    let script = write_tool(tmp.path());
    let doc = pdf(tmp.path(), "slow.pdf");

    let start = Instant::now();
    let err = tool(&script, Duration::from_secs(1))
        .run(&doc, OutputFormat::Md, tmp.path())
        .await
        .unwrap_err();

    assert!(matches!(err, InvocationError::TimedOut { secs: 1 }), "got: {err:?}");
    assert!(start.elapsed() < Duration::from_secs(10));
}

// ── Full batch through the subprocess ────────────────────────────────────────

#[tokio::test]
async fn batch_with_external_tool() {
    let tmp = TempDir::new().unwrap();
    let script = write_tool(tmp.path());
    let input = tmp.path().join("input_files");
    let output = tmp.path().join("output");
    let processed = tmp.path().join("processed_files");
    std::fs::create_dir(&input).unwrap();
    pdf(&input, "ok.pdf");
    pdf(&input, "fail.pdf");

    let config = BatchConfig::builder()
        .input_dir(&input)
        .output_dir(&output)
        .processed_dir(&processed)
        .tool("sh")
        .tool_args([script.display().to_string()])
        .max_retries(1)
        .timeout_secs(30)
        .build()
        .unwrap();

    let report = run_batch(&config).await.unwrap();

    assert_eq!(report.stats.total, 2);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.exit_code(), 1);

    let merged = std::fs::read_to_string(output.join("ok.md")).unwrap();
    assert_eq!(merged, "page one\n\npage two");
    assert!(processed.join("ok.pdf").exists());

    let failed = report.documents.iter().find(|d| d.name == "fail.pdf").unwrap();
    let err = failed.error.as_ref().unwrap();
    assert_eq!(err.kind, DocumentErrorKind::InvocationFailed);
    assert_eq!(failed.attempts, 2);
    assert_eq!(batch_ocr::summarize_error(&err.detail), "boom: fail");
    assert!(input.join("fail.pdf").exists());
}

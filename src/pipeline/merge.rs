//! Fragment merging: turn per-page OCR output into one file per document.
//!
//! The OCR tool writes one fragment per page, named
//! `[<dir>_]<stem>_p<N>.<format>`, where `<dir>` is the name of the directory
//! holding the PDF and `N` is a decimal page index. This stage collects a document's fragments, orders them by
//! the numeric page index `N` (so `_p10` follows `_p2`), concatenates them and
//! writes `<stem>.<format>` next to them. Fragments are removed only after the
//! merged file is in place.
//!
//! ## Merge rules
//!
//! * **CSV** — every page repeats the table header. The first fragment's first
//!   line is kept as the canonical header; a later fragment's first line is
//!   dropped when it equals that header. Lines are joined with `\n` and the
//!   file is written with a UTF-8 BOM so spreadsheet tools detect the encoding.
//! * **Markdown / JSON / HTML** — fragments are joined with a blank line.

use crate::config::OutputFormat;
use crate::error::MergeError;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

const BOM: char = '\u{feff}';

/// Matches the fragment file names of one document in one format.
///
/// Only `<stem>_p<digits>.<ext>` and `<dir>_<stem>_p<digits>.<ext>` match, so
/// merged output of other documents (`2024_scan_part.md`) is never picked up.
#[derive(Debug, Clone)]
pub struct FragmentPattern {
    regex: Regex,
    display: String,
}

impl FragmentPattern {
    pub fn new(
        stem: &str,
        dir_prefix: Option<&str>,
        format: OutputFormat,
    ) -> Result<Self, MergeError> {
        let ext = format.extension();
        let dir_prefix = dir_prefix.filter(|p| !p.is_empty());
        let prefix = match dir_prefix {
            Some(p) => format!("(?:{}_)?", regex::escape(p)),
            None => String::new(),
        };
        let regex = Regex::new(&format!(
            r"^{prefix}{}_p\d+\.{}$",
            regex::escape(stem),
            regex::escape(ext)
        ))?;
        let display = match dir_prefix {
            Some(p) => format!("[{p}_]{stem}_p<N>.{ext}"),
            None => format!("{stem}_p<N>.{ext}"),
        };
        Ok(Self { regex, display })
    }

    /// Pattern for the fragments of `pdf_path`, allowing the name of its
    /// parent directory as prefix.
    pub fn for_document(pdf_path: &Path, format: OutputFormat) -> Result<Self, MergeError> {
        let dir_prefix = pdf_path
            .parent()
            .and_then(|d| d.file_name())
            .and_then(|n| n.to_str());
        Self::new(document_stem(pdf_path)?, dir_prefix, format)
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }

    /// Readable form for messages, e.g. `[input_files_]scan_p<N>.md`.
    pub fn as_str(&self) -> &str {
        &self.display
    }
}

/// Page index embedded in a fragment's file stem: the text after the last `_p`.
///
/// Returns `None` when there is no `_p` or the suffix is not a number
/// (including one too large for `u64`).
pub fn parse_page_number(fragment_stem: &str) -> Option<u64> {
    let (_, suffix) = fragment_stem.rsplit_once("_p")?;
    suffix.parse().ok()
}

fn page_of(path: &Path) -> u64 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(parse_page_number)
        .unwrap_or(0)
}

fn document_stem(pdf_path: &Path) -> Result<&str, MergeError> {
    pdf_path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| MergeError::NoStem {
            path: pdf_path.to_path_buf(),
        })
}

/// List a document's fragments in page order.
///
/// Page indices that overflow `u64` sort as page 0; equal pages keep
/// directory listing order.
pub async fn find_fragments(
    pdf_path: &Path,
    output_dir: &Path,
    format: OutputFormat,
) -> Result<(FragmentPattern, Vec<PathBuf>), MergeError> {
    let pattern = FragmentPattern::for_document(pdf_path, format)?;

    let list_failed = |source: std::io::Error| MergeError::ListFailed {
        path: output_dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(output_dir).await.map_err(list_failed)?;
    let mut fragments = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(list_failed)? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if pattern.matches(name) {
            fragments.push(entry.path());
        }
    }

    // Stable: ties keep discovery order.
    fragments.sort_by_key(|p| page_of(p));
    Ok((pattern, fragments))
}

/// Delete every fragment of a document. Returns how many were removed.
pub async fn remove_fragments(
    pdf_path: &Path,
    output_dir: &Path,
    format: OutputFormat,
) -> Result<usize, MergeError> {
    let (_, fragments) = find_fragments(pdf_path, output_dir, format).await?;
    for path in &fragments {
        fs::remove_file(path)
            .await
            .map_err(|source| MergeError::RemoveFailed {
                path: path.clone(),
                source,
            })?;
    }
    Ok(fragments.len())
}

/// Concatenate fragment contents (already in page order) per `format`.
pub fn merge_contents(format: OutputFormat, contents: &[String]) -> String {
    match format {
        OutputFormat::Csv => merge_csv(contents),
        OutputFormat::Md | OutputFormat::Json | OutputFormat::Html => contents.join("\n\n"),
    }
}

fn merge_csv(contents: &[String]) -> String {
    let Some((first, rest)) = contents.split_first() else {
        return String::new();
    };

    let mut first_lines = first.split('\n');
    let header = first_lines.next().unwrap_or("");

    let mut lines: Vec<&str> = Vec::new();
    if !header.is_empty() {
        lines.push(header);
    }
    lines.extend(first_lines);

    for content in rest {
        let mut page_lines = content.split('\n').peekable();
        if page_lines.peek() == Some(&header) {
            page_lines.next();
        }
        lines.extend(page_lines);
    }

    lines.join("\n")
}

/// Merge a document's fragments into `<stem>.<format>` and delete them.
///
/// Returns the path of the merged file.
pub async fn merge_fragments(
    pdf_path: &Path,
    output_dir: &Path,
    format: OutputFormat,
) -> Result<PathBuf, MergeError> {
    let (pattern, fragments) = find_fragments(pdf_path, output_dir, format).await?;
    if fragments.is_empty() {
        return Err(MergeError::NoFragments {
            pattern: pattern.as_str().to_string(),
        });
    }
    debug!(
        "Merging {} fragments matching {}",
        fragments.len(),
        pattern.as_str()
    );

    let mut contents = Vec::with_capacity(fragments.len());
    for path in &fragments {
        let text = fs::read_to_string(path)
            .await
            .map_err(|source| MergeError::ReadFailed {
                path: path.clone(),
                source,
            })?;
        // The merged CSV carries its own BOM and compares header lines.
        contents.push(match text.strip_prefix(BOM) {
            Some(stripped) if format.writes_bom() => stripped.to_string(),
            _ => text,
        });
    }

    let mut merged = merge_contents(format, &contents);
    if format.writes_bom() {
        merged.insert(0, BOM);
    }

    let stem = document_stem(pdf_path)?;
    let out_path = output_dir.join(format!("{stem}.{}", format.extension()));
    write_atomic(&out_path, &merged).await?;

    for path in &fragments {
        fs::remove_file(path)
            .await
            .map_err(|source| MergeError::RemoveFailed {
                path: path.clone(),
                source,
            })?;
    }

    info!(
        "Merged {} pages into {}",
        fragments.len(),
        out_path.display()
    );
    Ok(out_path)
}

/// Write to a temp sibling, then rename over the target.
async fn write_atomic(path: &Path, content: &str) -> Result<(), MergeError> {
    let write_failed = |source: std::io::Error| MergeError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, content).await.map_err(write_failed)?;
    if let Err(e) = fs::rename(&tmp_path, path).await {
        if let Err(cleanup) = fs::remove_file(&tmp_path).await {
            warn!("Could not remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(write_failed(e));
    }
    Ok(())
}

//! File discovery: list the PDFs a batch will process.
//!
//! Matches the shell glob `*.pdf` in a single directory: regular files (or
//! symlinks to them) whose name ends in `.pdf`, hidden files excluded, no
//! recursion. The result is sorted by file name so runs are reproducible.

use crate::error::BatchError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Return the PDFs directly inside `dir`, sorted by file name.
///
/// An empty vector is not an error; the caller decides what an empty batch
/// means. A missing directory is [`BatchError::InputDirNotFound`].
pub async fn find_pdf_files(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !fs::try_exists(dir).await.unwrap_or(false) {
        return Err(BatchError::InputDirNotFound {
            path: dir.to_path_buf(),
        });
    }

    let unreadable = |source: std::io::Error| BatchError::InputDirUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir).await.map_err(unreadable)?;
    let mut pdfs = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        let path = entry.path();
        if !is_pdf_name(&entry.file_name()) {
            continue;
        }
        // Follows symlinks, like the glob does.
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => pdfs.push(path),
            Ok(_) => debug!("Skipping non-file entry: {}", path.display()),
            Err(e) => debug!("Skipping unreadable entry {}: {}", path.display(), e),
        }
    }

    pdfs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("Found {} PDF files in {}", pdfs.len(), dir.display());
    Ok(pdfs)
}

/// `*.pdf` as a shell glob sees it: case-sensitive, no dot-files.
fn is_pdf_name(name: &OsStr) -> bool {
    let Some(name) = name.to_str() else {
        return false;
    };
    !name.starts_with('.') && name.len() > ".pdf".len() && name.ends_with(".pdf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"%PDF-1.7").unwrap();
    }

    #[test]
    fn pdf_name_rules() {
        assert!(is_pdf_name(OsStr::new("scan.pdf")));
        assert!(!is_pdf_name(OsStr::new("scan.PDF")));
        assert!(!is_pdf_name(OsStr::new("scan.pdf.bak")));
        assert!(!is_pdf_name(OsStr::new(".hidden.pdf")));
        assert!(!is_pdf_name(OsStr::new("notes.txt")));
    }

    #[tokio::test]
    async fn sorted_by_name_and_filtered() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "b.pdf");
        touch(tmp.path(), "a.pdf");
        touch(tmp.path(), "c.txt");
        touch(tmp.path(), "a10.pdf");
        std::fs::create_dir(tmp.path().join("folder.pdf")).unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        touch(&tmp.path().join("nested"), "deep.pdf");

        let found = find_pdf_files(tmp.path()).await.unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.pdf", "a10.pdf", "b.pdf"]);
    }

    #[tokio::test]
    async fn empty_directory_is_ok() {
        let tmp = TempDir::new().unwrap();
        assert!(find_pdf_files(tmp.path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_directory_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let err = find_pdf_files(&tmp.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, BatchError::InputDirNotFound { .. }));
    }
}

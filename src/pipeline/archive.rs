//! Archiving: move a processed PDF out of the input directory.

use crate::error::ArchiveError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Move `pdf_path` into `processed_dir`, creating the directory if needed.
///
/// An existing file with the same name is overwritten. Falls back to
/// copy + remove when a rename is not possible (e.g. across file systems).
pub async fn move_processed_file(
    pdf_path: &Path,
    processed_dir: &Path,
) -> Result<PathBuf, ArchiveError> {
    fs::create_dir_all(processed_dir)
        .await
        .map_err(|source| ArchiveError::CreateDir {
            path: processed_dir.to_path_buf(),
            source,
        })?;

    let file_name = pdf_path.file_name().ok_or_else(|| ArchiveError::NoFileName {
        path: pdf_path.to_path_buf(),
    })?;
    let destination = processed_dir.join(file_name);

    let move_failed = |source: std::io::Error| ArchiveError::Move {
        from: pdf_path.to_path_buf(),
        to: destination.clone(),
        source,
    };

    if let Err(e) = fs::rename(pdf_path, &destination).await {
        debug!(
            "rename {} -> {} failed ({}), copying instead",
            pdf_path.display(),
            destination.display(),
            e
        );
        fs::copy(pdf_path, &destination).await.map_err(move_failed)?;
        fs::remove_file(pdf_path).await.map_err(move_failed)?;
    }

    debug!("Archived {} to {}", pdf_path.display(), destination.display());
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_directory_and_moves() {
        let tmp = TempDir::new().unwrap();
        let pdf = tmp.path().join("scan.pdf");
        std::fs::write(&pdf, b"%PDF").unwrap();
        let processed = tmp.path().join("processed_files").join("2024");

        let dest = tokio_test::block_on(move_processed_file(&pdf, &processed)).unwrap();

        assert_eq!(dest, processed.join("scan.pdf"));
        assert!(dest.exists());
        assert!(!pdf.exists());
    }

    #[tokio::test]
    async fn overwrites_existing_destination() {
        let tmp = TempDir::new().unwrap();
        let processed = tmp.path().join("done");
        std::fs::create_dir(&processed).unwrap();
        std::fs::write(processed.join("a.pdf"), b"old").unwrap();
        let pdf = tmp.path().join("a.pdf");
        std::fs::write(&pdf, b"new").unwrap();

        let dest = move_processed_file(&pdf, &processed).await.unwrap();
        assert_eq!(std::fs::read(dest).unwrap(), b"new");
    }

    #[tokio::test]
    async fn missing_source_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = move_processed_file(&tmp.path().join("gone.pdf"), &tmp.path().join("done"))
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Move { .. }), "got: {err:?}");
    }
}

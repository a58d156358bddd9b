//! File exports of the latest case record.
//!
//! Each finished record is written as `case_data.csv` and `case_data.pdf`
//! in the data directory, replacing the previous pair.

mod csv;
mod pdf;

pub use self::csv::{escape_csv, render_csv};
pub use self::pdf::render_pdf;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::models::CaseRecord;

pub const CSV_FILE: &str = "case_data.csv";
pub const PDF_FILE: &str = "case_data.pdf";

/// The only file names the download endpoint will serve.
pub const EXPORT_FILES: [&str; 2] = [CSV_FILE, PDF_FILE];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

/// Consumes a finished record and writes it somewhere.
pub trait CaseExporter: Send + Sync {
    fn export(&self, record: &CaseRecord) -> Result<(), ExportError>;

    /// Remove whatever a previous export produced.
    fn clear(&self) -> Result<(), ExportError>;
}

/// Writes the CSV and PDF exports into one directory.
#[derive(Debug, Clone)]
pub struct FileExporter {
    dir: PathBuf,
}

impl FileExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of an export file, or None for names outside [`EXPORT_FILES`].
    pub fn path_for(&self, filename: &str) -> Option<PathBuf> {
        EXPORT_FILES
            .contains(&filename)
            .then(|| self.dir.join(filename))
    }
}

impl CaseExporter for FileExporter {
    fn export(&self, record: &CaseRecord) -> Result<(), ExportError> {
        std::fs::create_dir_all(&self.dir)?;

        let csv_path = self.dir.join(CSV_FILE);
        std::fs::write(&csv_path, render_csv(record))?;
        debug!("Wrote {}", csv_path.display());

        let pdf_path = self.dir.join(PDF_FILE);
        std::fs::write(&pdf_path, render_pdf(record)?)?;
        debug!("Wrote {}", pdf_path.display());

        info!("Exported case data to {}", self.dir.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), ExportError> {
        for name in EXPORT_FILES {
            let path = self.dir.join(name);
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn test_export_writes_both_files() {
        let dir = tempdir().unwrap();
        let exporter = FileExporter::new(dir.path().join("out"));
        let record = CaseRecord::blank("https://example.org", Utc::now());

        exporter.export(&record).unwrap();

        let csv = std::fs::read_to_string(dir.path().join("out").join(CSV_FILE)).unwrap();
        assert!(csv.starts_with("Field,Value\n"));
        let pdf = std::fs::read(dir.path().join("out").join(PDF_FILE)).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let exporter = FileExporter::new(dir.path());
        exporter
            .export(&CaseRecord::blank("u", Utc::now()))
            .unwrap();

        exporter.clear().unwrap();
        exporter.clear().unwrap();
        assert!(!dir.path().join(CSV_FILE).exists());
        assert!(!dir.path().join(PDF_FILE).exists());
    }

    #[test]
    fn test_export_into_a_file_path_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let exporter = FileExporter::new(file.path());
        let err = exporter
            .export(&CaseRecord::blank("u", Utc::now()))
            .unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }

    #[test]
    fn test_only_known_files_resolve() {
        let exporter = FileExporter::new("/data");
        assert_eq!(
            exporter.path_for("case_data.csv"),
            Some(PathBuf::from("/data/case_data.csv"))
        );
        assert!(exporter.path_for("../etc/passwd").is_none());
        assert!(exporter.path_for("case_data.txt").is_none());
    }
}

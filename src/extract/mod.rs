//! Document text extraction.
//!
//! [`extract_document`] turns a file on disk into [`ExtractedText`]:
//!
//! - `.txt` / `.md`: read as UTF-8, invalid bytes replaced
//! - `.pdf`: embedded text via `pdf-extract`, page count via `lopdf`, and
//!   optional OCR (`pdftoppm`, `pdfimages` + `tesseract`) for scanned pages and embedded images
//! - `.docx`: `word/document.xml` read from the ZIP container
//! - `.doc`: rejected with a hint to convert to DOCX
//!
//! The result is always passed through [`clean_text`].

mod docx;
mod ocr;
mod pdf;

pub use ocr::is_available as ocr_available;

use std::path::{Path, PathBuf};

use crate::config::ExtractionConfig;
use crate::models::{DocumentFormat, ExtractedText};
use crate::utils::clean_text;

/// Options controlling extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Run OCR on scanned PDFs and on images embedded in PDF pages
    pub ocr: bool,
    /// Tesseract language code
    pub ocr_language: String,
    /// Render resolution for OCR
    pub ocr_dpi: u32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::from(&ExtractionConfig::default())
    }
}

impl From<&ExtractionConfig> for ExtractOptions {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            ocr: config.ocr,
            ocr_language: config.ocr_language.clone(),
            ocr_dpi: config.ocr_dpi,
        }
    }
}

impl ExtractOptions {
    pub fn without_ocr(mut self) -> Self {
        self.ocr = false;
        self
    }
}

/// Errors that can occur during extraction
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported file type '{0}' (expected .pdf, .docx or .txt)")]
    UnsupportedFormat(String),

    #[error("{} is a legacy .doc file; convert it to .docx and try again", .0.display())]
    LegacyDoc(PathBuf),

    #[error("Could not read {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("OCR is required but unavailable: {0}")]
    OcrUnavailable(String),

    #[error("OCR failed: {0}")]
    Ocr(String),
}

impl ExtractionError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn corrupt(path: &Path, reason: impl std::fmt::Display) -> Self {
        ExtractionError::Corrupt {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Extract and clean the text of a document
pub fn extract_document(
    path: &Path,
    options: &ExtractOptions,
) -> Result<ExtractedText, ExtractionError> {
    if !path.exists() {
        return Err(ExtractionError::NotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(ExtractionError::NotAFile(path.to_path_buf()));
    }

    let format = DocumentFormat::from_path(path).ok_or_else(|| {
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_else(|| "(none)".to_string());
        ExtractionError::UnsupportedFormat(ext)
    })?;

    tracing::debug!(path = %path.display(), %format, "Extracting text");

    let raw = match format {
        DocumentFormat::Txt => {
            let bytes = std::fs::read(path).map_err(|e| ExtractionError::io(path, e))?;
            RawDocument::text(String::from_utf8_lossy(&bytes).into_owned())
        }
        DocumentFormat::Pdf => pdf::extract(path, options)?,
        DocumentFormat::Docx => docx::extract(path)?,
        DocumentFormat::Doc => return Err(ExtractionError::LegacyDoc(path.to_path_buf())),
    };

    let document = ExtractedText::new(path, format, clean_text(&raw.text))
        .with_page_count(raw.pages)
        .with_image_count(raw.images);

    tracing::info!(
        path = %path.display(),
        pages = document.page_count(),
        words = document.word_count(),
        "Extracted text"
    );
    Ok(document)
}

/// Uncleaned extraction output shared by the format readers
struct RawDocument {
    text: String,
    pages: usize,
    images: usize,
}

impl RawDocument {
    fn text(text: String) -> Self {
        Self {
            text,
            pages: 1,
            images: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file() {
        let err = extract_document(Path::new("/nonexistent/notes.txt"), &ExtractOptions::default())
            .unwrap_err();
        assert!(matches!(err, ExtractionError::NotFound(_)));
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = tempdir().unwrap();
        let err = extract_document(dir.path(), &ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, ExtractionError::NotAFile(_)));
    }

    #[test]
    fn test_text_file_cleaned() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "  Heat   flows.\n\n\nEnergy is conserved.  \n").unwrap();

        let document = extract_document(&path, &ExtractOptions::default()).unwrap();
        assert_eq!(document.text(), "Heat flows. Energy is conserved.");
        assert_eq!(document.format(), DocumentFormat::Txt);
        assert_eq!(document.page_count(), 1);
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, b"caf\xe9 au lait").unwrap();

        let document = extract_document(&path, &ExtractOptions::default()).unwrap();
        assert!(document.text().starts_with("caf"));
        assert!(document.text().ends_with("au lait"));
    }

    #[test]
    fn test_legacy_doc_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("old.doc");
        fs::write(&path, b"\xd0\xcf\x11\xe0").unwrap();

        let err = extract_document(&path, &ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, ExtractionError::LegacyDoc(_)));
        assert!(err.to_string().contains(".docx"));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sheet.xlsx");
        fs::write(&path, b"data").unwrap();

        let err = extract_document(&path, &ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat(ref ext) if ext == ".xlsx"));
    }

    #[test]
    fn test_options_from_config() {
        let config = ExtractionConfig {
            ocr: false,
            ocr_language: "deu".to_string(),
            ocr_dpi: 150,
        };
        let options = ExtractOptions::from(&config);
        assert!(!options.ocr);
        assert_eq!(options.ocr_language, "deu");
        assert!(!ExtractOptions::default().without_ocr().ocr);
    }
}

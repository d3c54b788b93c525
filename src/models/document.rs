//! Extracted document text and supported input formats.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Supported input document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    /// Legacy binary Word document (recognised, not extractable)
    Doc,
    Txt,
}

impl DocumentFormat {
    /// Detect the format from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            "doc" => Some(DocumentFormat::Doc),
            "txt" | "text" | "md" => Some(DocumentFormat::Txt),
            _ => None,
        }
    }

    /// Detect the format from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocumentFormat::Pdf => "PDF",
            DocumentFormat::Docx => "DOCX",
            DocumentFormat::Doc => "DOC",
            DocumentFormat::Txt => "text",
        };
        write!(f, "{}", s)
    }
}

/// Plain text extracted from one source document
///
/// Created by the extractor, consumed once by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    source: PathBuf,
    format: DocumentFormat,
    text: String,
    page_count: usize,
    image_count: usize,
}

impl ExtractedText {
    pub fn new(source: impl Into<PathBuf>, format: DocumentFormat, text: String) -> Self {
        Self {
            source: source.into(),
            format,
            text,
            page_count: 1,
            image_count: 0,
        }
    }

    /// Build directly from in-memory text (no backing file)
    pub fn from_text(name: &str, text: impl Into<String>) -> Self {
        Self::new(name, DocumentFormat::Txt, text.into())
    }

    pub fn with_page_count(mut self, pages: usize) -> Self {
        self.page_count = pages;
        self
    }

    pub fn with_image_count(mut self, images: usize) -> Self {
        self.image_count = images;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// File name of the source, used as the document title
    pub fn source_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Number of images embedded in the document
    pub fn image_count(&self) -> usize {
        self.image_count
    }

    /// True when the text is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("notes/Lecture.PDF")),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("a.docx")),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("a.xlsx")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_blank_detection() {
        assert!(ExtractedText::from_text("x", "  \n\t ").is_blank());
        assert!(!ExtractedText::from_text("x", "Heat flows.").is_blank());
    }

    #[test]
    fn test_source_name() {
        let doc = ExtractedText::new("/tmp/thermo.pdf", DocumentFormat::Pdf, "text".into());
        assert_eq!(doc.source_name(), "thermo.pdf");
        assert_eq!(doc.word_count(), 1);
    }
}

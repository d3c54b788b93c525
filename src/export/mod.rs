//! Export of study materials to JSON and PDF files.

mod json;
mod pdf;

pub use json::{export_json, from_json, to_json};
pub use pdf::{export_pdf, render_pdf};

use std::path::{Path, PathBuf};

use crate::models::StudyMaterials;
use crate::utils::clean_filename;

/// Errors that can occur while writing exports
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

/// Default JSON and PDF destinations for a source document
///
/// `lecture notes.pdf` becomes `lecture notes_study_materials.json` and
/// `lecture notes_study_materials.pdf` in `dir`.
pub fn default_output_paths(source: &Path, dir: &Path) -> (PathBuf, PathBuf) {
    let stem = source
        .file_stem()
        .map(|s| clean_filename(&s.to_string_lossy()))
        .unwrap_or_else(|| clean_filename(""));

    (
        dir.join(format!("{}_study_materials.json", stem)),
        dir.join(format!("{}_study_materials.pdf", stem)),
    )
}

/// Which files to write for one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub json: Option<PathBuf>,
    pub pdf: Option<PathBuf>,
}

impl OutputPlan {
    /// Honor explicit destinations; with none given, write both defaults into `dir`
    pub fn new(source: &Path, dir: &Path, json: Option<&Path>, pdf: Option<&Path>) -> Self {
        if json.is_none() && pdf.is_none() {
            let (json, pdf) = default_output_paths(source, dir);
            return Self {
                json: Some(json),
                pdf: Some(pdf),
            };
        }

        Self {
            json: json.map(Path::to_path_buf),
            pdf: pdf.map(Path::to_path_buf),
        }
    }

    /// Export `materials` to every planned file
    pub fn write(&self, materials: &StudyMaterials) -> Result<(), ExportError> {
        if let Some(path) = &self.json {
            export_json(materials, path)?;
        }
        if let Some(path) = &self.pdf {
            export_pdf(materials, path)?;
        }
        Ok(())
    }

    /// Planned paths, JSON first
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.json.iter().chain(self.pdf.iter()).map(PathBuf::as_path)
    }
}

/// Write bytes to `path`, creating parent directories first
fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, bytes).map_err(io_err)?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Wrote export");
    Ok(())
}

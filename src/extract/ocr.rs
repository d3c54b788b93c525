//! OCR for scanned pages and embedded images.
//!
//! Whole pages are rendered with `pdftoppm` and embedded images are pulled out
//! with `pdfimages` (both poppler-utils), into a temporary directory, then read
//! with `tesseract`. All three must be on `PATH`.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use super::{ExtractOptions, ExtractionError};

static AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Whether `pdftoppm`, `pdfimages` and `tesseract` can be run. Checked once per process.
pub fn is_available() -> bool {
    *AVAILABLE.get_or_init(|| {
        let poppler = ["pdftoppm", "pdfimages"]
            .iter()
            .all(|tool| Command::new(tool).arg("-v").output().is_ok());
        let tesseract = Command::new("tesseract").arg("--version").output().is_ok();

        if !poppler {
            tracing::debug!("pdftoppm or pdfimages not found; install poppler-utils for OCR support");
        }
        if !tesseract {
            tracing::debug!("tesseract not found; install tesseract-ocr for OCR support");
        }
        poppler && tesseract
    })
}

fn require_tools() -> Result<(), ExtractionError> {
    if is_available() {
        Ok(())
    } else {
        Err(ExtractionError::OcrUnavailable(
            "install poppler-utils and tesseract-ocr, or run with --no-ocr".to_string(),
        ))
    }
}

/// OCR the given 1-based pages as whole rendered images, returning their text in page order
pub fn recognize_pages(
    path: &Path,
    pages: &[u32],
    options: &ExtractOptions,
) -> Result<Vec<String>, ExtractionError> {
    require_tools()?;
    let workdir = tempfile::tempdir().map_err(|e| ExtractionError::io(path, e))?;

    tracing::info!(
        path = %path.display(),
        pages = pages.len(),
        dpi = options.ocr_dpi,
        lang = %options.ocr_language,
        "Running OCR"
    );

    let mut texts = Vec::with_capacity(pages.len());
    for &page in pages {
        let prefix = workdir.path().join(format!("page-{}", page));

        let render = Command::new("pdftoppm")
            .arg("-png")
            .arg("-singlefile")
            .arg("-r")
            .arg(options.ocr_dpi.to_string())
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg(path)
            .arg(&prefix)
            .output()
            .map_err(|e| ExtractionError::Ocr(format!("failed to run pdftoppm: {}", e)))?;

        if !render.status.success() {
            return Err(ExtractionError::Ocr(format!(
                "pdftoppm failed on page {}: {}",
                page,
                String::from_utf8_lossy(&render.stderr).trim()
            )));
        }

        texts.push(tesseract(&prefix.with_extension("png"), options)?);
    }

    Ok(texts)
}

/// OCR the images embedded in one 1-based page, returning the text of each image
pub fn recognize_page_images(
    path: &Path,
    page: u32,
    options: &ExtractOptions,
) -> Result<Vec<String>, ExtractionError> {
    require_tools()?;
    let workdir = tempfile::tempdir().map_err(|e| ExtractionError::io(path, e))?;
    let prefix = workdir.path().join("img");

    let extracted = Command::new("pdfimages")
        .arg("-png")
        .arg("-f")
        .arg(page.to_string())
        .arg("-l")
        .arg(page.to_string())
        .arg(path)
        .arg(&prefix)
        .output()
        .map_err(|e| ExtractionError::Ocr(format!("failed to run pdfimages: {}", e)))?;

    if !extracted.status.success() {
        return Err(ExtractionError::Ocr(format!(
            "pdfimages failed on page {}: {}",
            page,
            String::from_utf8_lossy(&extracted.stderr).trim()
        )));
    }

    let images = extracted_images(workdir.path()).map_err(|e| ExtractionError::io(path, e))?;
    tracing::debug!(page, images = images.len(), "Running OCR on embedded images");

    images
        .iter()
        .map(|image| tesseract(image, options))
        .collect()
}

/// Images written by `pdfimages`, in extraction order
fn extracted_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "png") {
            images.push(path);
        }
    }
    // img-000.png, img-001.png, ...
    images.sort();
    Ok(images)
}

fn tesseract(image: &Path, options: &ExtractOptions) -> Result<String, ExtractionError> {
    let recognized = Command::new("tesseract")
        .arg(image)
        .arg("stdout")
        .arg("-l")
        .arg(&options.ocr_language)
        .arg("--psm")
        .arg("1")
        .output()
        .map_err(|e| ExtractionError::Ocr(format!("failed to run tesseract: {}", e)))?;

    if !recognized.status.success() {
        tracing::warn!(
            image = %image.display(),
            "tesseract reported an error: {}",
            String::from_utf8_lossy(&recognized.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&recognized.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_extracted_images_sorted_png_only() {
        let dir = tempdir().unwrap();
        for name in ["img-001.png", "img-000.png", "img-002.ppm"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let images = extracted_images(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["img-000.png", "img-001.png"]);
    }
}

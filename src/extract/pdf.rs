//! PDF text extraction.
//!
//! `pdf-extract` reads the embedded text layer. `lopdf` supplies the page
//! list and the image XObjects of each page, which decide what goes to OCR.

use std::path::Path;

use lopdf::{Document, Object, ObjectId};

use super::{ocr, ExtractOptions, ExtractionError, RawDocument};

pub(super) fn extract(path: &Path, options: &ExtractOptions) -> Result<RawDocument, ExtractionError> {
    let document = Document::load(path).map_err(|e| ExtractionError::corrupt(path, e))?;
    let page_ids = document.get_pages();
    let page_numbers: Vec<u32> = page_ids.keys().copied().collect();
    let pages = page_numbers.len();

    let image_pages: Vec<(u32, usize)> = page_ids
        .iter()
        .map(|(&number, &id)| (number, page_image_count(&document, id)))
        .filter(|&(_, count)| count > 0)
        .collect();
    let images = image_pages.iter().map(|&(_, count)| count).sum();

    let text = match pdf_extract::extract_text(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(path = %path.display(), "pdf-extract failed, using lopdf text: {}", e);
            document
                .extract_text(&page_numbers)
                .map_err(|e| ExtractionError::corrupt(path, e))?
        }
    };

    if text.trim().is_empty() {
        if !options.ocr {
            tracing::warn!(
                path = %path.display(),
                "PDF has no text layer and OCR is disabled"
            );
            return Ok(RawDocument { text, pages, images });
        }

        let recognized = ocr::recognize_pages(path, &page_numbers, options)?;
        return Ok(RawDocument {
            text: recognized.join("\n"),
            pages,
            images,
        });
    }

    if image_pages.is_empty() || !options.ocr {
        return Ok(RawDocument { text, pages, images });
    }

    if !ocr::is_available() {
        tracing::warn!(
            path = %path.display(),
            images,
            "Skipping OCR of embedded images: poppler-utils or tesseract not installed"
        );
        return Ok(RawDocument { text, pages, images });
    }

    let mut combined = text;
    for &(page, count) in &image_pages {
        match ocr::recognize_page_images(path, page, options) {
            Ok(recognized) => {
                for image_text in recognized.iter().filter(|t| !t.trim().is_empty()) {
                    combined.push('\n');
                    combined.push_str(image_text);
                }
            }
            Err(e) => {
                tracing::warn!(page, images = count, "OCR of embedded images failed: {}", e);
            }
        }
    }

    Ok(RawDocument {
        text: combined,
        pages,
        images,
    })
}

/// Number of image XObjects in a page's resources, including inherited ones
fn page_image_count(document: &Document, page_id: ObjectId) -> usize {
    let mut node = document.get_dictionary(page_id).ok();
    while let Some(dict) = node {
        let resources = dict
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve(document, r))
            .and_then(|r| r.as_dict().ok());

        if let Some(resources) = resources {
            return resources
                .get(b"XObject")
                .ok()
                .and_then(|x| resolve(document, x))
                .and_then(|x| x.as_dict().ok())
                .map(|xobjects| {
                    xobjects
                        .iter()
                        .filter(|(_, object)| is_image(document, object))
                        .count()
                })
                .unwrap_or(0);
        }

        node = dict
            .get(b"Parent")
            .ok()
            .and_then(|p| resolve(document, p))
            .and_then(|p| p.as_dict().ok());
    }
    0
}

fn is_image(document: &Document, object: &Object) -> bool {
    match resolve(document, object) {
        Some(Object::Stream(stream)) => stream
            .dict
            .get(b"Subtype")
            .and_then(|s| s.as_name())
            .map(|name| name == b"Image")
            .unwrap_or(false),
        _ => false,
    }
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

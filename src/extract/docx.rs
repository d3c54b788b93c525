//! DOCX text extraction.
//!
//! A DOCX file is a ZIP container; the body lives in `word/document.xml`.
//! Paragraphs become lines and the cells of a table row are joined with
//! spaces onto one line.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::{ExtractionError, RawDocument};

const DOCUMENT_XML: &str = "word/document.xml";
const MEDIA_PREFIX: &str = "word/media/";

pub(super) fn extract(path: &Path) -> Result<RawDocument, ExtractionError> {
    let file = File::open(path).map_err(|e| ExtractionError::io(path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ExtractionError::corrupt(path, e))?;

    let images = archive
        .file_names()
        .filter(|name| name.starts_with(MEDIA_PREFIX))
        .count();

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_XML)
        .map_err(|e| ExtractionError::corrupt(path, format!("{}: {}", DOCUMENT_XML, e)))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::io(path, e))?;

    let text = document_text(&xml).map_err(|e| ExtractionError::corrupt(path, e))?;

    Ok(RawDocument {
        text,
        pages: 1,
        images,
    })
}

/// Plain text of a `word/document.xml` body
fn document_text(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);

    let mut lines: Vec<String> = Vec::new();
    let mut paragraph = String::new();
    let mut cells: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_text = false;
    let mut table_depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:t" => in_text = true,
                b"w:tbl" => table_depth += 1,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => paragraph.push('\t'),
                b"w:br" | b"w:cr" => paragraph.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                paragraph.push_str(&t.unescape()?);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    let finished = std::mem::take(&mut paragraph);
                    let finished = finished.trim();
                    if table_depth > 0 {
                        if !finished.is_empty() {
                            if !cell.is_empty() {
                                cell.push(' ');
                            }
                            cell.push_str(finished);
                        }
                    } else {
                        lines.push(finished.to_string());
                    }
                }
                b"w:tc" => {
                    let finished = std::mem::take(&mut cell);
                    if !finished.is_empty() {
                        cells.push(finished);
                    }
                }
                b"w:tr" => {
                    if !cells.is_empty() {
                        lines.push(cells.join(" "));
                        cells.clear();
                    }
                }
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    const BODY: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Thermodynamics</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">Heat flows </w:t></w:r><w:r><w:t>from hot to cold.</w:t></w:r></w:p>
    <w:tbl>
      <w:tr>
        <w:tc><w:p><w:r><w:t>Law</w:t></w:r></w:p></w:tc>
        <w:tc><w:p><w:r><w:t>Statement</w:t></w:r></w:p></w:tc>
      </w:tr>
      <w:tr>
        <w:tc><w:p><w:r><w:t>First</w:t></w:r></w:p></w:tc>
        <w:tc><w:p><w:r><w:t>Energy &amp; work are conserved</w:t></w:r></w:p></w:tc>
      </w:tr>
    </w:tbl>
    <w:p><w:r><w:t>End</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    #[test]
    fn test_document_text_paragraphs_and_tables() {
        let text = document_text(BODY).unwrap();
        assert_eq!(
            text,
            "Thermodynamics\nHeat flows from hot to cold.\nLaw Statement\nFirst Energy & work are conserved\nEnd"
        );
    }

    #[test]
    fn test_extract_from_zip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.docx");
        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file(DOCUMENT_XML, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(BODY.as_bytes()).unwrap();
        writer
            .start_file("word/media/image1.png", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"png").unwrap();
        writer.finish().unwrap();

        let raw = extract(&path).unwrap();
        assert!(raw.text.starts_with("Thermodynamics"));
        assert_eq!(raw.images, 1);
    }

    #[test]
    fn test_not_a_zip_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fake.docx");
        std::fs::write(&path, b"plain text pretending").unwrap();

        assert!(matches!(extract(&path), Err(ExtractionError::Corrupt { .. })));
    }
}

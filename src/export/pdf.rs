//! PDF export.
//!
//! Lays out a title page followed by "Questions & Answers", "Flash Cards" and
//! "Summary" sections on A4 pages using the standard Helvetica fonts. Text is
//! encoded as WinAnsi; characters outside it are replaced with `?`.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;

use super::{write_file, ExportError};
use crate::models::StudyMaterials;

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 56;

const TITLE_SIZE: i64 = 24;
const HEADING_SIZE: i64 = 16;
const BODY_SIZE: i64 = 11;
const FOOTER_SIZE: i64 = 9;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

/// Write materials to a PDF file
pub fn export_pdf(materials: &StudyMaterials, path: &Path) -> Result<(), ExportError> {
    let bytes = render_pdf(materials)?;
    write_file(path, &bytes)?;
    tracing::info!(path = %path.display(), "Saved PDF");
    Ok(())
}

/// Render materials to PDF bytes
pub fn render_pdf(materials: &StudyMaterials) -> Result<Vec<u8>, ExportError> {
    let mut layout = Layout::new();

    title_page(&mut layout, materials);

    if !materials.questions.is_empty() {
        layout.new_page();
        layout.heading("Questions & Answers");
        for (i, question) in materials.questions.iter().enumerate() {
            layout.keep_together(4);
            layout.paragraph(
                &format!("Q{}. [{}] {}", i + 1, question.kind.label(), question.question),
                BOLD,
                BODY_SIZE,
                0,
            );
            if let Some(choices) = &question.choices {
                for (letter, choice) in ('A'..='Z').zip(choices) {
                    layout.paragraph(&format!("{}) {}", letter, choice), REGULAR, BODY_SIZE, 16);
                }
            }
            layout.paragraph(&format!("Answer: {}", question.answer), REGULAR, BODY_SIZE, 16);
            if let Some(explanation) = &question.explanation {
                layout.paragraph(
                    &format!("Explanation: {}", explanation),
                    REGULAR,
                    BODY_SIZE,
                    16,
                );
            }
            layout.space(8);
        }
    }

    if !materials.flashcards.is_empty() {
        layout.new_page();
        layout.heading("Flash Cards");
        for (i, card) in materials.flashcards.iter().enumerate() {
            layout.keep_together(3);
            layout.paragraph(&format!("Card {}", i + 1), BOLD, BODY_SIZE, 0);
            layout.paragraph(&format!("Front: {}", card.front), REGULAR, BODY_SIZE, 16);
            layout.paragraph(&format!("Back: {}", card.back), REGULAR, BODY_SIZE, 16);
            layout.space(8);
        }
    }

    summary_section(&mut layout, materials);

    layout.finish()
}

fn summary_section(layout: &mut Layout, materials: &StudyMaterials) {
    let extras = [
        ("Engineering Applications", materials.applications.as_deref()),
        ("Important Formulas & Equations", materials.formulas.as_deref()),
    ];
    let has_extras = extras.iter().any(|(_, text)| text.is_some());
    if materials.summary.is_empty() && materials.key_concepts.is_empty() && !has_extras {
        return;
    }

    layout.new_page();
    layout.heading("Summary");
    if !materials.key_concepts.is_empty() {
        layout.paragraph("Key Concepts", BOLD, BODY_SIZE + 1, 0);
        for concept in &materials.key_concepts {
            layout.paragraph(&format!("- {}", concept), REGULAR, BODY_SIZE, 16);
        }
        layout.space(12);
    }
    if !materials.summary.is_empty() {
        layout.paragraph("Main Summary", BOLD, BODY_SIZE + 1, 0);
        layout.paragraph(&materials.summary, REGULAR, BODY_SIZE, 0);
        layout.space(12);
    }
    for (title, text) in extras {
        if let Some(text) = text {
            layout.keep_together(2);
            layout.paragraph(title, BOLD, BODY_SIZE + 1, 0);
            layout.paragraph(text, REGULAR, BODY_SIZE, 0);
            layout.space(12);
        }
    }
}

fn title_page(layout: &mut Layout, materials: &StudyMaterials) {
    layout.space(160);
    layout.paragraph("Study Materials", BOLD, TITLE_SIZE, 0);
    layout.space(12);
    layout.paragraph(materials.display_name(), REGULAR, HEADING_SIZE, 0);
    layout.space(24);
    layout.paragraph(
        &format!("Generated by {}", materials.provider.name()),
        REGULAR,
        BODY_SIZE,
        0,
    );
    layout.paragraph(
        &materials.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        REGULAR,
        BODY_SIZE,
        0,
    );
    layout.space(12);
    layout.paragraph(
        &format!(
            "{} questions, {} flash cards",
            materials.questions.len(),
            materials.flashcards.len()
        ),
        REGULAR,
        BODY_SIZE,
        0,
    );
}

/// Accumulates text operations into pages with a top-down cursor
struct Layout {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: i64,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn new_page(&mut self) {
        if !self.current.is_empty() {
            let page = std::mem::take(&mut self.current);
            self.pages.push(page);
        }
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Start a new page unless `lines` body lines still fit
    fn keep_together(&mut self, lines: i64) {
        if self.y - lines * line_height(BODY_SIZE) < MARGIN {
            self.new_page();
        }
    }

    fn space(&mut self, points: i64) {
        self.y -= points;
    }

    fn heading(&mut self, text: &str) {
        self.paragraph(text, BOLD, HEADING_SIZE, 0);
        self.space(10);
    }

    fn paragraph(&mut self, text: &str, font: &str, size: i64, indent: i64) {
        let width = PAGE_WIDTH - 2 * MARGIN - indent;
        for line in wrap(text, max_chars(width, size)) {
            if self.y - line_height(size) < MARGIN {
                self.new_page();
            }
            self.y -= line_height(size);
            self.text_at(&line, font, size, MARGIN + indent, self.y);
        }
    }

    fn text_at(&mut self, text: &str, font: &str, size: i64, x: i64, y: i64) {
        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.into(), size.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(win_ansi(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn finish(mut self) -> Result<Vec<u8>, ExportError> {
        self.new_page();
        let total = self.pages.len();

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                REGULAR => regular_id,
                BOLD => bold_id,
            },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(total);
        for (index, mut operations) in self.pages.into_iter().enumerate() {
            let footer = format!("Page {} of {}", index + 1, total);
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![REGULAR.into(), FOOTER_SIZE.into()]),
                Operation::new("Td", vec![(PAGE_WIDTH / 2 - 30).into(), (MARGIN / 2).into()]),
                Operation::new("Tj", vec![Object::string_literal(win_ansi(&footer))]),
                Operation::new("ET", vec![]),
            ]);

            let content = Content { operations }
                .encode()
                .map_err(|e| ExportError::Pdf(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let media_box: Vec<Object> = vec![
            0i64.into(),
            0i64.into(),
            PAGE_WIDTH.into(),
            PAGE_HEIGHT.into(),
        ];
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => total as i64,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        Ok(bytes)
    }
}

fn line_height(size: i64) -> i64 {
    size + size / 3 + 1
}

/// Approximate characters per line for Helvetica at `size`
fn max_chars(width: i64, size: i64) -> usize {
    // Average Helvetica glyph is a little over half the font size
    ((width * 100) / (size * 53)).max(10) as usize
}

/// Greedy word wrap; words longer than a line are split
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for raw_line in text.lines() {
        let mut line = String::new();
        let mut len = 0usize;

        for word in raw_line.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if len > 0 {
                    lines.push(std::mem::take(&mut line));
                    len = 0;
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            if len > 0 && len + 1 + word.len() > max_chars {
                lines.push(std::mem::take(&mut line));
                len = 0;
            }
            if len > 0 {
                line.push(' ');
                len += 1;
            }
            len += word.len();
            line.extend(word);
        }

        if !line.is_empty() {
            lines.push(line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Encode text for a WinAnsiEncoding font
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '\u{2022}' => 0x95,
            '\u{2026}' => 0x85,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{20ac}' => 0x80,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Flashcard, ProviderKind, Question, QuestionKind};
    use tempfile::tempdir;

    fn sample(questions: usize) -> StudyMaterials {
        let mut materials = StudyMaterials::new(ProviderKind::LocalTemplate);
        materials.source = Some("thermo.pdf".to_string());
        for i in 0..questions {
            materials.questions.push(
                Question::new(
                    QuestionKind::MultipleChoice,
                    format!("Question {} about heat and work?", i),
                    "Joule",
                )
                .with_choices(vec!["Joule".into(), "Watt".into(), "Newton".into()]),
            );
        }
        materials
            .flashcards
            .push(Flashcard::new("Entropy", "Measure of disorder"));
        materials.summary = "Energy is conserved.".to_string();
        materials.key_concepts = vec!["Energy".to_string()];
        materials
    }

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn test_render_sections_on_separate_pages() {
        let bytes = render_pdf(&sample(2)).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        // title, questions, flash cards, summary
        assert_eq!(page_count(&bytes), 4);
    }

    fn shown_text(layout: &Layout) -> Vec<String> {
        layout
            .pages
            .iter()
            .chain(std::iter::once(&layout.current))
            .flatten()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_summary_section_lists_every_part() {
        let mut materials = sample(0);
        materials.applications = Some("Heat engines".to_string());
        materials.formulas = Some("W = Qh - Qc".to_string());

        let mut layout = Layout::new();
        summary_section(&mut layout, &materials);
        let text = shown_text(&layout);

        for expected in [
            "Summary",
            "Key Concepts",
            "- Energy",
            "Energy is conserved.",
            "Engineering Applications",
            "Heat engines",
            "Important Formulas & Equations",
            "W = Qh - Qc",
        ] {
            assert!(text.iter().any(|line| line == expected), "missing {expected}");
        }
    }

    #[test]
    fn test_summary_section_without_extras() {
        let mut layout = Layout::new();
        summary_section(&mut layout, &sample(0));
        let text = shown_text(&layout);
        assert!(!text.iter().any(|line| line == "Engineering Applications"));

        let mut layout = Layout::new();
        summary_section(&mut layout, &StudyMaterials::new(ProviderKind::Gemini));
        assert!(shown_text(&layout).is_empty());
    }

    #[test]
    fn test_long_content_paginates() {
        let bytes = render_pdf(&sample(80)).unwrap();
        assert!(page_count(&bytes) > 5);
    }

    #[test]
    fn test_empty_sections_skipped() {
        let materials = StudyMaterials::new(ProviderKind::Gemini);
        let bytes = render_pdf(&materials).unwrap();
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn test_export_pdf_writes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out/study.pdf");
        export_pdf(&sample(1), &path).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("aaa bbb ccc", 7), vec!["aaa bbb", "ccc"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("one\ntwo", 20), vec!["one", "two"]);
        assert_eq!(wrap("", 20), vec![""]);
    }

    #[test]
    fn test_win_ansi() {
        assert_eq!(win_ansi("a\u{2014}é€"), vec![b'a', 0x97, 0xe9, 0x80]);
        assert_eq!(win_ansi("ΔT"), vec![b'?', b'T']);
    }
}

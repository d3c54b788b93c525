//! Prompt shared by the remote providers.
//!
//! One prompt asks for every requested content kind at once and pins the
//! exact JSON shape the response parser expects.

use std::fmt::Write;

use crate::models::{ContentRequest, QuestionKind};

/// System instructions sent alongside every prompt
pub const SYSTEM_PROMPT: &str = "You are an expert educator who writes accurate study materials \
from course documents. Use only facts stated in the document. Respond with a single JSON object \
and nothing else.";

/// Build the user prompt for `text` (already truncated to the provider's limit).
pub fn build_prompt(text: &str, request: &ContentRequest) -> String {
    let mut prompt = String::with_capacity(text.len() + 2048);

    prompt.push_str("Create study materials for students from the document below.\n\n");
    prompt.push_str("Generate exactly:\n");

    for kind in QuestionKind::ALL {
        let count = request.count_for(kind);
        if count > 0 {
            let _ = writeln!(prompt, "- {} {} question(s)", count, kind.id());
        }
    }
    if request.flashcards > 0 {
        let _ = writeln!(
            prompt,
            "- {} flashcard(s): a key term or concept on the front, a concise definition on the back",
            request.flashcards
        );
    }
    if request.summary {
        let _ = writeln!(
            prompt,
            "- a summary of about {} words, a short list of key concepts, real-world \
             applications of the material, and its important formulas or equations (empty if none)",
            request.summary_words
        );
    }

    prompt.push_str(
        "\nMultiple choice questions must have exactly 4 choices and the answer must be the \
         text of the correct choice, not its letter. Every question needs a non-empty answer and a one-sentence \
         explanation.\n\n",
    );
    prompt.push_str("Return JSON with this shape (omit sections that were not requested):\n");
    prompt.push_str(
        r#"{
  "questions": [
    {
      "type": "multiple_choice" | "short_answer" | "conceptual" | "application",
      "question": "Question text",
      "choices": ["A", "B", "C", "D"],
      "answer": "Correct answer",
      "explanation": "Why this is correct"
    }
  ],
  "flashcards": [{ "front": "Term", "back": "Definition" }],
  "summary": "Summary text",
  "key_concepts": ["Concept"],
  "applications": "Real-world applications and use cases",
  "formulas": "Important formulas and equations"
}"#,
    );
    prompt.push_str("\n\nDocument text:\n");
    prompt.push_str(text);

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_requested_kinds_only() {
        let request = ContentRequest::empty()
            .with_questions(QuestionKind::MultipleChoice, 3)
            .with_flashcards(5);

        let prompt = build_prompt("Heat flows from hot to cold.", &request);

        assert!(prompt.contains("- 3 multiple_choice question(s)"));
        assert!(prompt.contains("- 5 flashcard(s)"));
        assert!(!prompt.contains("short_answer question(s)"));
        assert!(!prompt.contains("words, a short list"));
        assert!(prompt.ends_with("Heat flows from hot to cold."));
    }

    #[test]
    fn test_prompt_includes_summary_target() {
        let request = ContentRequest::empty().with_summary(true).with_summary_words(80);
        let prompt = build_prompt("text", &request);
        assert!(prompt.contains("about 80 words"));
        assert!(prompt.contains("formulas or equations"));
        assert!(prompt.contains("\"applications\":"));
    }
}

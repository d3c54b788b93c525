//! Defensive parsing of provider responses into [`StudyMaterials`].
//!
//! Responses are free-form text that should contain one JSON object. The
//! parser tolerates Markdown fences, surrounding prose and the field names the
//! models commonly drift to (`term`/`definition`, `options`, `main_summary`).
//! Lettered options (`A) Joule`) lose their labels and a letter answer is
//! mapped onto its choice. Any failure becomes [`ProviderError::MalformedResponse`].

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use super::ProviderError;
use crate::models::{Flashcard, ProviderKind, Question, QuestionKind, StudyMaterials};

#[derive(Debug, Deserialize)]
struct RawMaterials {
    #[serde(default, alias = "questions_answers", alias = "quiz")]
    questions: Vec<RawQuestion>,

    #[serde(default, alias = "flash_cards", alias = "cards")]
    flashcards: Vec<RawFlashcard>,

    #[serde(default, alias = "summaries")]
    summary: Option<RawSummary>,

    #[serde(default)]
    main_summary: Option<String>,

    #[serde(default, alias = "key_points")]
    key_concepts: Option<Value>,

    #[serde(default, alias = "engineering_applications")]
    applications: Option<Value>,

    #[serde(default, alias = "equations")]
    formulas: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(default, rename = "type", alias = "kind", alias = "question_type")]
    kind: Option<String>,

    #[serde(default, alias = "prompt")]
    question: Option<String>,

    #[serde(default, alias = "correct_answer")]
    answer: Option<Value>,

    #[serde(default, alias = "options")]
    choices: Option<Vec<Value>>,

    #[serde(default)]
    explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFlashcard {
    #[serde(default, alias = "term", alias = "question")]
    front: Option<String>,

    #[serde(default, alias = "definition", alias = "answer")]
    back: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSummary {
    Text(String),
    Sections(HashMap<String, Value>),
}

/// Locate the JSON object in a raw response.
///
/// Tries the whole (fence-stripped) body first, then the span from the first
/// `{` to the last `}`.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let body = strip_code_fence(raw.trim());
    if body.starts_with('{') && body.ends_with('}') {
        return Some(body);
    }

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (end > start).then(|| &body[start..=end])
}

fn strip_code_fence(body: &str) -> &str {
    let Some(rest) = body.strip_prefix("```") else {
        return body;
    };
    // Drop the info string ("json") on the opening fence line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse a provider's raw text into study materials attributed to `provider`.
pub fn parse_materials(raw: &str, provider: ProviderKind) -> Result<StudyMaterials, ProviderError> {
    let json = extract_json_object(raw).ok_or_else(|| {
        ProviderError::MalformedResponse("response contains no JSON object".to_string())
    })?;

    let parsed: RawMaterials = serde_json::from_str(json)?;

    let mut materials = StudyMaterials::new(provider);
    materials.questions = parsed.questions.into_iter().map(convert_question).collect();
    materials.flashcards = parsed
        .flashcards
        .into_iter()
        .map(|card| {
            Flashcard::new(
                card.front.unwrap_or_default().trim(),
                card.back.unwrap_or_default().trim(),
            )
        })
        .collect();

    let (summary, sections) = match parsed.summary {
        Some(RawSummary::Text(text)) => (Some(text), HashMap::new()),
        Some(RawSummary::Sections(sections)) => {
            let summary = sections
                .get("main_summary")
                .or_else(|| sections.get("summary"))
                .map(section_text);
            (summary, sections)
        }
        None => (None, HashMap::new()),
    };
    let section = |flat: Option<Value>, names: &[&str]| {
        flat.or_else(|| names.iter().find_map(|name| sections.get(*name).cloned()))
    };

    materials.summary = summary
        .or(parsed.main_summary)
        .unwrap_or_default()
        .trim()
        .to_string();

    materials.key_concepts = section(parsed.key_concepts, &["key_concepts", "key_points"])
        .map(|value| concept_list(&value))
        .unwrap_or_default();
    materials.applications = section(
        parsed.applications,
        &["applications", "engineering_applications"],
    )
    .map(|value| section_text(&value))
    .filter(|text| !text.is_empty());
    materials.formulas = section(parsed.formulas, &["formulas", "equations"])
        .map(|value| section_text(&value))
        .filter(|text| !text.is_empty());

    Ok(materials)
}

fn convert_question(raw: RawQuestion) -> Question {
    let choices: Option<Vec<String>> = raw.choices.map(|choices| {
        let choices: Vec<String> = choices
            .iter()
            .map(|c| value_to_string(c).trim().to_string())
            .collect();
        strip_option_labels(choices)
    });

    let kind = raw
        .kind
        .as_deref()
        .and_then(QuestionKind::parse_loose)
        .unwrap_or(if choices.is_some() {
            QuestionKind::MultipleChoice
        } else {
            QuestionKind::ShortAnswer
        });

    let answer = raw.answer.as_ref().map(value_to_string).unwrap_or_default();
    let answer = match &choices {
        Some(choices) => resolve_answer(&answer, choices),
        None => answer.trim().to_string(),
    };

    let mut question = Question::new(kind, raw.question.unwrap_or_default().trim(), answer);
    question.choices = choices;
    question.explanation = raw
        .explanation
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());
    question
}

/// Split a leading option label (`A)`, `b.`, `C:` or `(D)`) off `text`,
/// returning the option's zero-based index and the remaining text.
fn option_label(text: &str) -> Option<(usize, &str)> {
    let text = text.trim();
    let (body, closing): (&str, &[char]) = match text.strip_prefix('(') {
        Some(rest) => (rest, &[')']),
        None => (text, &[')', '.', ':']),
    };

    let letter = body.chars().next().filter(char::is_ascii_alphabetic)?;
    let rest = body[1..].strip_prefix(closing)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((letter_index(letter), rest.trim()))
}

fn letter_index(letter: char) -> usize {
    (letter.to_ascii_lowercase() as u8 - b'a') as usize
}

/// Drop `A) ` style labels, but only when every choice carries the label of its own position.
fn strip_option_labels(choices: Vec<String>) -> Vec<String> {
    let labelled = choices
        .iter()
        .enumerate()
        .all(|(position, choice)| matches!(option_label(choice), Some((i, rest)) if i == position && !rest.is_empty()));
    if !labelled {
        return choices;
    }

    choices
        .iter()
        .filter_map(|choice| option_label(choice).map(|(_, rest)| rest.to_string()))
        .collect()
}

/// Map an answer given as a letter (`B`, `b)`, `(B) Watt`) onto the text of that choice
fn resolve_answer(answer: &str, choices: &[String]) -> String {
    let answer = answer.trim();
    if let Some(choice) = choices.iter().find(|c| c.eq_ignore_ascii_case(answer)) {
        return choice.clone();
    }

    let labelled = match answer.chars().next() {
        Some(letter) if answer.len() == 1 && letter.is_ascii_alphabetic() => {
            Some((letter_index(letter), ""))
        }
        _ => option_label(answer),
    };
    if let Some((index, rest)) = labelled {
        let by_text = choices
            .iter()
            .find(|c| !rest.is_empty() && c.eq_ignore_ascii_case(rest));
        if let Some(choice) = by_text.or_else(|| choices.get(index)) {
            return choice.clone();
        }
    }
    answer.to_string()
}

/// Key concepts given as a list or as bulleted lines
fn concept_list(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items.iter().map(value_to_string).collect(),
        other => value_to_string(other).lines().map(str::to_string).collect(),
    };
    items
        .into_iter()
        .map(|c| c.trim().trim_start_matches(['•', '-', '*']).trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// A summary section as text; lists become one item per line
fn section_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| value_to_string(item).trim().to_string())
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        other => value_to_string(other).trim().to_string(),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_object() {
        assert_eq!(extract_json_object(r#"{"a":1}"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_extract_fenced_object() {
        let raw = "```json\n{\"summary\": \"x\"}\n```";
        assert_eq!(extract_json_object(raw), Some("{\"summary\": \"x\"}"));
    }

    #[test]
    fn test_extract_object_in_prose() {
        let raw = "Here you go: {\"summary\": \"x\"} Hope it helps!";
        assert_eq!(extract_json_object(raw), Some("{\"summary\": \"x\"}"));
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn test_parse_full_response() {
        let raw = r#"{
            "questions": [
                {"type": "multiple_choice", "question": "Unit of energy?",
                 "choices": ["Joule", "Watt", "Newton", "Pascal"], "answer": "Joule",
                 "explanation": "Energy is measured in joules."},
                {"type": "short_answer", "question": "Define entropy.", "answer": "A measure of disorder."}
            ],
            "flashcards": [{"front": "Enthalpy", "back": "Total heat content"}],
            "summary": "Thermodynamics studies energy.",
            "key_concepts": ["Energy", "Entropy"]
        }"#;

        let materials = parse_materials(raw, ProviderKind::Gemini).unwrap();
        assert_eq!(materials.provider, ProviderKind::Gemini);
        assert_eq!(materials.questions.len(), 2);
        assert_eq!(materials.questions[0].kind, QuestionKind::MultipleChoice);
        assert_eq!(materials.questions[0].choices.as_ref().unwrap().len(), 4);
        assert_eq!(materials.flashcards[0].front, "Enthalpy");
        assert_eq!(materials.summary, "Thermodynamics studies energy.");
        assert_eq!(materials.key_concepts, vec!["Energy", "Entropy"]);
    }

    #[test]
    fn test_parse_legacy_field_names() {
        let raw = r#"{
            "questions": [{"type": "Multiple Choice", "question": "2+2?", "options": [3, 4, 5, 6], "answer": 4}],
            "flash_cards": [{"term": "Heat", "definition": "Energy in transit"}],
            "summary": {"main_summary": "Short summary", "formulas": "Q = mcΔT"},
            "key_concepts": "• First\n• Second"
        }"#;

        let materials = parse_materials(raw, ProviderKind::Claude).unwrap();
        let question = &materials.questions[0];
        assert_eq!(question.kind, QuestionKind::MultipleChoice);
        assert_eq!(question.answer, "4");
        assert_eq!(
            question.choices.as_deref().unwrap(),
            &["3".to_string(), "4".to_string(), "5".to_string(), "6".to_string()]
        );
        assert_eq!(materials.flashcards[0].back, "Energy in transit");
        assert_eq!(materials.summary, "Short summary");
        assert_eq!(materials.formulas.as_deref(), Some("Q = mcΔT"));
        assert!(materials.applications.is_none());
        assert_eq!(materials.key_concepts, vec!["First", "Second"]);
    }

    #[test]
    fn test_parse_summary_sections() {
        let raw = r#"{
            "summaries": {
                "key_concepts": "Energy\nEntropy",
                "main_summary": "Thermodynamics studies energy.",
                "engineering_applications": ["Heat engines", "Refrigerators"],
                "formulas": "W = Q_h - Q_c"
            }
        }"#;

        let materials = parse_materials(raw, ProviderKind::Gemini).unwrap();
        assert_eq!(materials.summary, "Thermodynamics studies energy.");
        assert_eq!(materials.key_concepts, vec!["Energy", "Entropy"]);
        assert_eq!(
            materials.applications.as_deref(),
            Some("Heat engines\nRefrigerators")
        );
        assert_eq!(materials.formulas.as_deref(), Some("W = Q_h - Q_c"));
    }

    #[test]
    fn test_parse_flat_applications_and_formulas() {
        let raw = r#"{
            "summary": "Heat moves.",
            "applications": "Car engines",
            "formulas": ""
        }"#;

        let materials = parse_materials(raw, ProviderKind::OpenAi).unwrap();
        assert_eq!(materials.applications.as_deref(), Some("Car engines"));
        assert!(materials.formulas.is_none());
    }

    #[test]
    fn test_letter_answer_mapped_onto_choice() {
        let raw = r#"{"questions": [
            {"type": "multiple_choice", "question": "Unit of energy?",
             "options": ["A) Joule", "B) Watt", "C) Newton", "D) Pascal"], "answer": "A"},
            {"type": "multiple_choice", "question": "Unit of power?",
             "options": ["(A) Joule", "(B) Watt", "(C) Newton", "(D) Pascal"], "answer": "b) Watt"},
            {"type": "multiple_choice", "question": "Unit of force?",
             "options": ["Joule", "Watt", "Newton", "Pascal"], "answer": "C."}
        ]}"#;

        let materials = parse_materials(raw, ProviderKind::Claude).unwrap();
        let questions = &materials.questions;
        assert_eq!(questions[0].answer, "Joule");
        assert_eq!(
            questions[0].choices.as_deref().unwrap(),
            &["Joule", "Watt", "Newton", "Pascal"].map(String::from)
        );
        assert_eq!(questions[1].answer, "Watt");
        assert_eq!(questions[2].answer, "Newton");
        assert!(questions.iter().all(Question::answer_in_choices));
    }

    #[test]
    fn test_unlabelled_choices_kept_verbatim() {
        let choices = vec!["A. Einstein".to_string(), "Newton".to_string()];
        assert_eq!(strip_option_labels(choices.clone()), choices);

        assert_eq!(option_label("A) Joule"), Some((0, "Joule")));
        assert_eq!(option_label("(d)"), Some((3, "")));
        assert_eq!(option_label("Atoms"), None);
        assert_eq!(resolve_answer("Z", &choices), "Z");
    }

    #[test]
    fn test_unknown_kind_falls_back_on_choices() {
        let raw = r#"{"questions": [{"type": "essay", "question": "Q", "answer": "A"}]}"#;
        let materials = parse_materials(raw, ProviderKind::OpenAi).unwrap();
        assert_eq!(materials.questions[0].kind, QuestionKind::ShortAnswer);
    }

    #[test]
    fn test_malformed_json_is_provider_error() {
        let err = parse_materials("{\"questions\": [", ProviderKind::Gemini).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));

        let err = parse_materials("I cannot help with that.", ProviderKind::Gemini).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }
}

//! Study materials produced by a provider: questions, flashcards and a summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The provider that produced a set of study materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "claude")]
    Claude,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "local-template")]
    LocalTemplate,
}

impl ProviderKind {
    /// Fallback priority: free-quota providers first, paid next, the
    /// credential-free template generator last.
    pub const PRIORITY: [ProviderKind; 4] = [
        ProviderKind::Gemini,
        ProviderKind::Claude,
        ProviderKind::OpenAi,
        ProviderKind::LocalTemplate,
    ];

    /// Returns the display name of the provider
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "Google Gemini",
            ProviderKind::Claude => "Anthropic Claude",
            ProviderKind::OpenAi => "OpenAI GPT",
            ProviderKind::LocalTemplate => "Local template",
        }
    }

    /// Returns the provider identifier used for provenance
    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Claude => "claude",
            ProviderKind::OpenAi => "openai",
            ProviderKind::LocalTemplate => "local-template",
        }
    }

    /// Whether this provider calls a remote API
    pub fn is_remote(&self) -> bool {
        !matches!(self, ProviderKind::LocalTemplate)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Kind of quiz question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    ShortAnswer,
    Conceptual,
    Application,
}

impl QuestionKind {
    pub const ALL: [QuestionKind; 4] = [
        QuestionKind::MultipleChoice,
        QuestionKind::ShortAnswer,
        QuestionKind::Conceptual,
        QuestionKind::Application,
    ];

    /// Returns the wire identifier (`multiple_choice`, ...)
    pub fn id(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::ShortAnswer => "short_answer",
            QuestionKind::Conceptual => "conceptual",
            QuestionKind::Application => "application",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "Multiple choice",
            QuestionKind::ShortAnswer => "Short answer",
            QuestionKind::Conceptual => "Conceptual",
            QuestionKind::Application => "Application",
        }
    }

    /// Parse the loose spellings providers use for question types.
    pub fn parse_loose(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();

        match normalized.as_str() {
            "multiple_choice" | "multiplechoice" | "mcq" | "mc" => Some(QuestionKind::MultipleChoice),
            "short_answer" | "shortanswer" | "short" | "open" => Some(QuestionKind::ShortAnswer),
            "conceptual" | "concept" => Some(QuestionKind::Conceptual),
            "application" | "applied" | "application_based" => Some(QuestionKind::Application),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// A single quiz question with its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "type")]
    pub kind: QuestionKind,

    /// The question prompt
    pub question: String,

    /// The expected answer
    pub answer: String,

    /// Answer options (multiple choice only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,

    /// Optional explanation of the answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    pub fn new(kind: QuestionKind, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            kind,
            question: question.into(),
            answer: answer.into(),
            choices: None,
            explanation: None,
        }
    }

    pub fn with_choices(mut self, choices: Vec<String>) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Whether the answer is one of the choices, ignoring case and padding
    pub fn answer_in_choices(&self) -> bool {
        let answer = self.answer.trim();
        self.choices
            .iter()
            .flatten()
            .any(|c| c.trim().eq_ignore_ascii_case(answer))
    }
}

/// A flashcard: term or prompt on the front, definition on the back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

impl Flashcard {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
        }
    }
}

/// The structured result of one successful generation
///
/// Owned by the caller once returned; tagged with the provider that produced
/// it and the time it was generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyMaterials {
    /// Provenance: which provider produced this result
    pub provider: ProviderKind,

    /// When the result was generated
    pub generated_at: DateTime<Utc>,

    /// Source document name, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    pub questions: Vec<Question>,

    pub flashcards: Vec<Flashcard>,

    #[serde(default)]
    pub summary: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_concepts: Vec<String>,

    /// Real-world applications of the material
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applications: Option<String>,

    /// Important formulas and equations, if the document has any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formulas: Option<String>,
}

impl StudyMaterials {
    /// Create empty materials attributed to `provider`
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            generated_at: Utc::now(),
            source: None,
            questions: Vec::new(),
            flashcards: Vec::new(),
            summary: String::new(),
            key_concepts: Vec::new(),
            applications: None,
            formulas: None,
        }
    }

    /// Number of questions of the given kind
    pub fn count_of(&self, kind: QuestionKind) -> usize {
        self.questions.iter().filter(|q| q.kind == kind).count()
    }

    /// Questions of the given kind, in order
    pub fn questions_of(&self, kind: QuestionKind) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(move |q| q.kind == kind)
    }

    /// Document name for display, falling back to a generic title
    pub fn display_name(&self) -> &str {
        self.source.as_deref().unwrap_or("Study Materials")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_ids() {
        assert_eq!(ProviderKind::LocalTemplate.id(), "local-template");
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
        assert!(ProviderKind::Gemini.is_remote());
        assert!(!ProviderKind::LocalTemplate.is_remote());
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(ProviderKind::PRIORITY[0], ProviderKind::Gemini);
        assert_eq!(ProviderKind::PRIORITY[3], ProviderKind::LocalTemplate);
    }

    #[test]
    fn test_question_kind_loose_parsing() {
        assert_eq!(
            QuestionKind::parse_loose("Multiple Choice"),
            Some(QuestionKind::MultipleChoice)
        );
        assert_eq!(
            QuestionKind::parse_loose("short-answer"),
            Some(QuestionKind::ShortAnswer)
        );
        assert_eq!(QuestionKind::parse_loose("essay"), None);
    }

    #[test]
    fn test_question_serializes_type_field() {
        let q = Question::new(QuestionKind::ShortAnswer, "What is entropy?", "Disorder");
        let json = serde_json::to_value(&q).unwrap();

        assert_eq!(json["type"], "short_answer");
        assert!(json.get("choices").is_none());
        assert!(json.get("explanation").is_none());
    }

    #[test]
    fn test_answer_in_choices() {
        let q = Question::new(QuestionKind::MultipleChoice, "Unit of energy?", "joule ")
            .with_choices(vec!["Joule".into(), "Watt".into()]);
        assert!(q.answer_in_choices());

        let q = Question::new(QuestionKind::MultipleChoice, "Unit of energy?", "A")
            .with_choices(vec!["Joule".into(), "Watt".into()]);
        assert!(!q.answer_in_choices());
        assert!(!Question::new(QuestionKind::ShortAnswer, "Q", "A").answer_in_choices());
    }

    #[test]
    fn test_count_of() {
        let mut materials = StudyMaterials::new(ProviderKind::LocalTemplate);
        materials
            .questions
            .push(Question::new(QuestionKind::Conceptual, "Q1", "A1"));
        materials
            .questions
            .push(Question::new(QuestionKind::Conceptual, "Q2", "A2"));

        assert_eq!(materials.count_of(QuestionKind::Conceptual), 2);
        assert_eq!(materials.count_of(QuestionKind::Application), 0);
    }
}

//! Credential-free template generator.
//!
//! Builds study materials mechanically from the document's own sentences and
//! most frequent terms. No network access, deterministic output, and no
//! failure path: it is the last link of every automatic chain.

use async_trait::async_trait;

use super::{Provider, ProviderError};
use crate::models::{
    ContentRequest, Flashcard, ProviderKind, Question, QuestionKind, StudyMaterials,
};
use crate::utils::{key_terms, split_sentences, truncate_with_ellipsis};

/// Pads multiple choice options when the document has too few distinct terms
const GENERIC_CHOICES: [&str; 3] = [
    "None of the above",
    "All of the above",
    "Not discussed in the document",
];

const CHOICES_PER_QUESTION: usize = 4;
const MAX_KEY_CONCEPTS: usize = 8;
const MAX_PROMPT_SENTENCE_CHARS: usize = 300;
const MAX_SECTION_SENTENCES: usize = 3;

/// Words marking a sentence as describing a practical use
const APPLICATION_CUES: [&str; 6] = ["used", "applied", "application", "engine", "design", "device"];

/// Deterministic template-based provider
#[derive(Debug, Clone)]
pub struct LocalTemplateProvider {
    term_pool: usize,
}

impl Default for LocalTemplateProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalTemplateProvider {
    pub fn new() -> Self {
        Self { term_pool: 24 }
    }

    /// Build materials synchronously; never fails.
    pub fn build(&self, text: &str, request: &ContentRequest) -> StudyMaterials {
        let source = Source::analyze(text, self.term_pool);
        let mut materials = StudyMaterials::new(ProviderKind::LocalTemplate);

        for i in 0..request.multiple_choice {
            materials.questions.push(source.multiple_choice(i));
        }
        for i in 0..request.short_answer {
            materials.questions.push(source.short_answer(i));
        }
        for i in 0..request.conceptual {
            materials.questions.push(source.conceptual(i));
        }
        for i in 0..request.application {
            // Start after the short-answer sentences so prompts differ when possible
            materials
                .questions
                .push(source.application(i + request.short_answer));
        }
        for i in 0..request.flashcards {
            materials.flashcards.push(source.flashcard(i));
        }

        if request.summary {
            materials.summary = source.summary(request.summary_words);
            materials.key_concepts = source.terms.iter().take(MAX_KEY_CONCEPTS).cloned().collect();
            materials.applications = source.section(|s| {
                let lower = s.to_ascii_lowercase();
                APPLICATION_CUES.iter().any(|cue| lower.contains(cue))
            });
            materials.formulas = source.section(|s| s.contains('='));
        }

        materials
    }
}

/// Sentences and ranked terms of one document
struct Source {
    sentences: Vec<String>,
    terms: Vec<String>,
}

impl Source {
    fn analyze(text: &str, term_pool: usize) -> Self {
        let mut sentences = split_sentences(text);
        if sentences.is_empty() {
            sentences.push("The document contains no readable sentences.".to_string());
        }

        let mut terms = key_terms(text, term_pool);
        if terms.is_empty() {
            terms.push("Main idea".to_string());
        }

        Self { sentences, terms }
    }

    fn sentence(&self, index: usize) -> &str {
        &self.sentences[index % self.sentences.len()]
    }

    fn term(&self, index: usize) -> &str {
        &self.terms[index % self.terms.len()]
    }

    /// First sentence mentioning `term`, or the indexed sentence
    fn sentence_for(&self, term: &str, index: usize) -> &str {
        let needle = term.to_ascii_lowercase();
        self.sentences
            .iter()
            .find(|s| s.to_ascii_lowercase().contains(&needle))
            .map(String::as_str)
            .unwrap_or_else(|| self.sentence(index))
    }

    fn multiple_choice(&self, index: usize) -> Question {
        let term = self.term(index);
        let sentence = self.sentence_for(term, index);

        let prompt = match blank_out(sentence, term) {
            Some(blanked) => format!(
                "Fill in the blank: {}",
                truncate_with_ellipsis(&blanked, MAX_PROMPT_SENTENCE_CHARS)
            ),
            None => format!(
                "Which term is most closely associated with this statement? \"{}\"",
                truncate_with_ellipsis(sentence, MAX_PROMPT_SENTENCE_CHARS)
            ),
        };

        let choices = self.choices_for(term, index);
        Question::new(QuestionKind::MultipleChoice, prompt, term)
            .with_choices(choices)
            .with_explanation(format!(
                "The document states: \"{}\"",
                truncate_with_ellipsis(sentence, MAX_PROMPT_SENTENCE_CHARS)
            ))
    }

    /// Four distinct options containing `answer` at a position that rotates with `index`
    fn choices_for(&self, answer: &str, index: usize) -> Vec<String> {
        let answer_lower = answer.to_ascii_lowercase();
        let mut distractors: Vec<String> = Vec::with_capacity(CHOICES_PER_QUESTION);

        let count = self.terms.len();
        for offset in 1..count {
            if distractors.len() == CHOICES_PER_QUESTION - 1 {
                break;
            }
            let candidate = self.term(index + offset);
            if candidate.to_ascii_lowercase() != answer_lower
                && !distractors.iter().any(|d| d.eq_ignore_ascii_case(candidate))
            {
                distractors.push(candidate.to_string());
            }
        }
        for generic in GENERIC_CHOICES {
            if distractors.len() == CHOICES_PER_QUESTION - 1 {
                break;
            }
            if !generic.eq_ignore_ascii_case(answer) {
                distractors.push(generic.to_string());
            }
        }

        let position = index % (distractors.len() + 1);
        distractors.insert(position, answer.to_string());
        distractors
    }

    fn short_answer(&self, index: usize) -> Question {
        let sentence = self.sentence(index);
        Question::new(
            QuestionKind::ShortAnswer,
            format!(
                "In your own words, explain the following statement: \"{}\"",
                truncate_with_ellipsis(sentence, MAX_PROMPT_SENTENCE_CHARS)
            ),
            sentence,
        )
    }

    fn conceptual(&self, index: usize) -> Question {
        let term = self.term(index);
        let sentence = self.sentence_for(term, index);
        Question::new(
            QuestionKind::Conceptual,
            format!("What is meant by \"{}\" in this document?", term),
            sentence,
        )
        .with_explanation(format!("\"{}\" is one of the document's key terms.", term))
    }

    fn application(&self, index: usize) -> Question {
        let sentence = self.sentence(index);
        Question::new(
            QuestionKind::Application,
            format!(
                "Describe a practical situation where this idea applies: \"{}\"",
                truncate_with_ellipsis(sentence, MAX_PROMPT_SENTENCE_CHARS)
            ),
            format!("A good answer applies this idea to a concrete example: {}", sentence),
        )
    }

    fn flashcard(&self, index: usize) -> Flashcard {
        let term = self.term(index);
        Flashcard::new(term, self.sentence_for(term, index))
    }

    /// The first few sentences matching `keep`, one per line
    fn section(&self, keep: impl Fn(&str) -> bool) -> Option<String> {
        let lines: Vec<&str> = self
            .sentences
            .iter()
            .map(String::as_str)
            .filter(|s| keep(s))
            .take(MAX_SECTION_SENTENCES)
            .collect();
        (!lines.is_empty()).then(|| lines.join("\n"))
    }

    /// Leading sentences until the word target is reached (at least one)
    fn summary(&self, target_words: usize) -> String {
        let mut words = 0;
        let mut parts: Vec<&str> = Vec::new();

        for sentence in &self.sentences {
            if !parts.is_empty() && words >= target_words {
                break;
            }
            words += sentence.split_whitespace().count();
            parts.push(sentence);
        }

        parts.join(" ")
    }
}

/// Replace the first case-insensitive occurrence of `term` with a blank
fn blank_out(sentence: &str, term: &str) -> Option<String> {
    // Terms are ASCII, so lowercasing keeps byte offsets aligned
    let start = sentence
        .to_ascii_lowercase()
        .find(&term.to_ascii_lowercase())?;
    let end = start + term.len();
    Some(format!("{}_____{}", &sentence[..start], &sentence[end..]))
}

#[async_trait]
impl Provider for LocalTemplateProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::LocalTemplate
    }

    async fn generate(
        &self,
        text: &str,
        request: &ContentRequest,
    ) -> Result<StudyMaterials, ProviderError> {
        Ok(self.build(text, request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THERMO: &str = "Thermodynamics is the branch of physics that deals with heat, work, \
        and temperature. The first law of thermodynamics states that energy cannot be created or \
        destroyed. The second law states that the entropy of an isolated system never decreases. \
        Heat flows spontaneously from a hotter body to a colder body. Entropy is a measure of \
        disorder in a system.";

    #[test]
    fn test_counts_match_request() {
        let request = ContentRequest::empty()
            .with_questions(QuestionKind::MultipleChoice, 3)
            .with_flashcards(5)
            .with_summary(true);

        let materials = LocalTemplateProvider::new().build(THERMO, &request);

        assert_eq!(materials.provider, ProviderKind::LocalTemplate);
        assert_eq!(materials.count_of(QuestionKind::MultipleChoice), 3);
        assert_eq!(materials.questions.len(), 3);
        assert_eq!(materials.flashcards.len(), 5);
        assert!(!materials.summary.is_empty());
    }

    #[test]
    fn test_multiple_choice_shape() {
        let request = ContentRequest::empty().with_questions(QuestionKind::MultipleChoice, 6);
        let materials = LocalTemplateProvider::new().build(THERMO, &request);

        for question in &materials.questions {
            let choices = question.choices.as_ref().unwrap();
            assert_eq!(choices.len(), 4);
            assert!(choices.contains(&question.answer));
            let mut unique = choices.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), 4);
        }
    }

    #[test]
    fn test_deterministic() {
        let provider = LocalTemplateProvider::new();
        let request = ContentRequest::default();
        let a = provider.build(THERMO, &request);
        let b = provider.build(THERMO, &request);
        assert_eq!(a.questions, b.questions);
        assert_eq!(a.flashcards, b.flashcards);
        assert_eq!(a.summary, b.summary);
    }

    #[test]
    fn test_cycles_short_documents() {
        let request = ContentRequest::default().with_flashcards(12);
        let materials = LocalTemplateProvider::new().build("Photosynthesis converts light.", &request);

        assert_eq!(materials.flashcards.len(), 12);
        assert_eq!(materials.questions.len(), request.total_questions());
        assert!(materials
            .questions
            .iter()
            .all(|q| !q.question.is_empty() && !q.answer.is_empty()));
        assert!(materials
            .flashcards
            .iter()
            .all(|c| !c.front.is_empty() && !c.back.is_empty()));
    }

    #[test]
    fn test_no_empty_fields_for_degenerate_text() {
        let materials = LocalTemplateProvider::new().build("!!! ...", &ContentRequest::default());
        assert!(materials.questions.iter().all(|q| !q.answer.is_empty()));
        assert!(!materials.summary.is_empty());
    }

    #[test]
    fn test_summary_respects_word_target() {
        let request = ContentRequest::empty().with_summary(true).with_summary_words(10);
        let materials = LocalTemplateProvider::new().build(THERMO, &request);
        assert!(materials.summary.starts_with("Thermodynamics is the branch"));
        assert!(!materials.summary.contains("Entropy is a measure"));
        assert!(!materials.key_concepts.is_empty());
    }

    #[test]
    fn test_applications_and_formulas_from_sentences() {
        let text = "A heat engine is used to turn heat into work. \
            The efficiency is e = 1 - Tc/Th. Entropy is a measure of disorder.";
        let request = ContentRequest::empty().with_summary(true);
        let materials = LocalTemplateProvider::new().build(text, &request);

        assert_eq!(
            materials.applications.as_deref(),
            Some("A heat engine is used to turn heat into work.")
        );
        assert_eq!(
            materials.formulas.as_deref(),
            Some("The efficiency is e = 1 - Tc/Th.")
        );

        let materials = LocalTemplateProvider::new().build(THERMO, &request);
        assert!(materials.formulas.is_none());
    }

    #[test]
    fn test_blank_out_case_insensitive() {
        assert_eq!(
            blank_out("Entropy rises.", "entropy").as_deref(),
            Some("_____ rises.")
        );
        assert_eq!(blank_out("Heat flows.", "entropy"), None);
    }

    #[tokio::test]
    async fn test_generate_never_fails() {
        let result = LocalTemplateProvider::new()
            .generate("", &ContentRequest::default())
            .await;
        assert!(result.is_ok());
    }
}

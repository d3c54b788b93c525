//! Content request describing what to generate.

use serde::{Deserialize, Serialize};

use super::QuestionKind;

bitflags::bitflags! {
    /// Content kinds a request can ask for and a provider can produce
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ContentKinds: u32 {
        const MULTIPLE_CHOICE = 1 << 0;
        const SHORT_ANSWER = 1 << 1;
        const CONCEPTUAL = 1 << 2;
        const APPLICATION = 1 << 3;
        const FLASHCARDS = 1 << 4;
        const SUMMARY = 1 << 5;
    }
}

impl ContentKinds {
    /// The flag corresponding to a question kind
    pub fn for_question(kind: QuestionKind) -> Self {
        match kind {
            QuestionKind::MultipleChoice => ContentKinds::MULTIPLE_CHOICE,
            QuestionKind::ShortAnswer => ContentKinds::SHORT_ANSWER,
            QuestionKind::Conceptual => ContentKinds::CONCEPTUAL,
            QuestionKind::Application => ContentKinds::APPLICATION,
        }
    }
}

/// What to generate from a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRequest {
    #[serde(default = "default_multiple_choice")]
    pub multiple_choice: usize,

    #[serde(default = "default_two")]
    pub short_answer: usize,

    #[serde(default = "default_two")]
    pub conceptual: usize,

    #[serde(default = "default_two")]
    pub application: usize,

    #[serde(default = "default_flashcards")]
    pub flashcards: usize,

    #[serde(default = "default_true")]
    pub summary: bool,

    /// Target summary length in words
    #[serde(default = "default_summary_words")]
    pub summary_words: usize,
}

impl Default for ContentRequest {
    fn default() -> Self {
        Self {
            multiple_choice: default_multiple_choice(),
            short_answer: default_two(),
            conceptual: default_two(),
            application: default_two(),
            flashcards: default_flashcards(),
            summary: true,
            summary_words: default_summary_words(),
        }
    }
}

fn default_multiple_choice() -> usize {
    4
}

fn default_two() -> usize {
    2
}

fn default_flashcards() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_summary_words() -> usize {
    150
}

impl ContentRequest {
    /// A request that asks for nothing; use the `with_*` setters to fill it in
    pub fn empty() -> Self {
        Self {
            multiple_choice: 0,
            short_answer: 0,
            conceptual: 0,
            application: 0,
            flashcards: 0,
            summary: false,
            summary_words: default_summary_words(),
        }
    }

    pub fn with_questions(mut self, kind: QuestionKind, count: usize) -> Self {
        match kind {
            QuestionKind::MultipleChoice => self.multiple_choice = count,
            QuestionKind::ShortAnswer => self.short_answer = count,
            QuestionKind::Conceptual => self.conceptual = count,
            QuestionKind::Application => self.application = count,
        }
        self
    }

    pub fn with_flashcards(mut self, count: usize) -> Self {
        self.flashcards = count;
        self
    }

    pub fn with_summary(mut self, summary: bool) -> Self {
        self.summary = summary;
        self
    }

    pub fn with_summary_words(mut self, words: usize) -> Self {
        self.summary_words = words;
        self
    }

    /// Requested number of questions of the given kind
    pub fn count_for(&self, kind: QuestionKind) -> usize {
        match kind {
            QuestionKind::MultipleChoice => self.multiple_choice,
            QuestionKind::ShortAnswer => self.short_answer,
            QuestionKind::Conceptual => self.conceptual,
            QuestionKind::Application => self.application,
        }
    }

    /// Total number of questions requested across all kinds
    pub fn total_questions(&self) -> usize {
        QuestionKind::ALL.iter().map(|k| self.count_for(*k)).sum()
    }

    /// The content kinds this request needs a provider to support
    pub fn required_kinds(&self) -> ContentKinds {
        let mut kinds = ContentKinds::empty();
        for kind in QuestionKind::ALL {
            if self.count_for(kind) > 0 {
                kinds |= ContentKinds::for_question(kind);
            }
        }
        if self.flashcards > 0 {
            kinds |= ContentKinds::FLASHCARDS;
        }
        if self.summary {
            kinds |= ContentKinds::SUMMARY;
        }
        kinds
    }

    /// Whether the request asks for no content at all
    pub fn is_empty(&self) -> bool {
        self.required_kinds().is_empty()
    }
}

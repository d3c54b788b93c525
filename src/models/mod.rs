//! Core data models for documents, content requests and generated study materials.

mod document;
mod materials;
mod request;

pub use document::{DocumentFormat, ExtractedText};
pub use materials::{Flashcard, ProviderKind, Question, QuestionKind, StudyMaterials};
pub use request::{ContentKinds, ContentRequest};

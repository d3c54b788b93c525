//! # studykit
//!
//! Turns PDF, DOCX and plain-text documents into study materials: quiz
//! questions, flash cards and a summary.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`extract`]: Text extraction from documents, with OCR for scanned PDFs
//! - [`providers`]: AI provider adapters behind a common trait
//! - [`generation`]: Provider fallback orchestration and result validation
//! - [`export`]: JSON and PDF output
//! - [`models`]: Core data structures (ExtractedText, ContentRequest, StudyMaterials)
//! - [`config`]: Configuration management
//! - [`ui`]: Terminal output helpers for the command line tool
//! - [`utils`]: HTTP client and text helpers

pub mod config;
pub mod export;
pub mod extract;
pub mod generation;
pub mod models;
pub mod providers;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use generation::{Generation, GenerationError, Orchestrator};
pub use models::{ContentRequest, ExtractedText, StudyMaterials};
pub use providers::{Provider, ProviderRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! AI provider adapters with a single trait-based seam.
//!
//! This module defines the [`Provider`] trait that every backend implements.
//! A provider turns `(text, request)` into [`StudyMaterials`] or fails with a
//! [`ProviderError`]; it never retries internally. Fallback between providers
//! is the orchestrator's job.
//!
//! # Backends
//!
//! - [`GeminiProvider`] - Google Gemini, enabled by `GOOGLE_API_KEY`
//! - [`ClaudeProvider`] - Anthropic Claude, enabled by `ANTHROPIC_API_KEY`
//! - [`OpenAiProvider`] - OpenAI GPT, enabled by `OPENAI_API_KEY`
//! - [`LocalTemplateProvider`] - deterministic, credential-free, never fails
//!
//! The remote adapters share one prompt ([`prompt`]) and one defensive
//! response parser ([`response`]).

mod claude;
mod gemini;
mod local;
mod openai;
pub mod prompt;
mod registry;
pub mod response;

pub mod mock;

pub use claude::ClaudeProvider;
pub use gemini::GeminiProvider;
pub use local::LocalTemplateProvider;
pub use mock::MockProvider;
pub use openai::OpenAiProvider;
pub use registry::{ProviderPreference, ProviderRegistry};

use async_trait::async_trait;

use crate::models::{ContentKinds, ContentRequest, ProviderKind, StudyMaterials};

/// The Provider trait defines the interface for all generation backends.
///
/// # Implementing a New Provider
///
/// 1. Create a struct that implements `Provider`
/// 2. Implement `kind` and `generate`; override `capabilities` if the backend
///    cannot produce every content kind
/// 3. Register it with [`ProviderRegistry`] or pass it to the orchestrator directly
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Which backend this is; also the provenance recorded on results
    fn kind(&self) -> ProviderKind;

    /// Human-readable name of this provider
    fn name(&self) -> &str {
        self.kind().name()
    }

    /// Content kinds this provider can produce
    fn capabilities(&self) -> ContentKinds {
        ContentKinds::all()
    }

    /// Whether this provider can satisfy every kind the request needs
    fn supports(&self, request: &ContentRequest) -> bool {
        self.capabilities().contains(request.required_kinds())
    }

    /// Generate study materials from document text
    async fn generate(
        &self,
        text: &str,
        request: &ContentRequest,
    ) -> Result<StudyMaterials, ProviderError>;
}

/// Errors that can occur when calling a provider
///
/// All of these are recoverable: the orchestrator records them and moves on
/// to the next provider in the chain.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Missing or rejected credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limit or quota exceeded
    #[error("Rate limit or quota exceeded: {0}")]
    RateLimited(String),

    /// Network or transport error
    #[error("Network error: {0}")]
    Network(String),

    /// The call did not finish in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The response could not be parsed into study materials
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The prompt exceeded what the provider accepts
    #[error("Request too large: {0}")]
    RequestTooLarge(String),

    /// Any other error status returned by the API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response parsed but did not satisfy the request
    #[error("Incomplete result: {0}")]
    Incomplete(String),

    /// The provider could not be constructed
    #[error("Provider misconfigured: {0}")]
    Configuration(String),
}

impl ProviderError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => ProviderError::Authentication(message),
            408 | 504 => ProviderError::Timeout(message),
            413 => ProviderError::RequestTooLarge(message),
            429 => ProviderError::RateLimited(message),
            _ => ProviderError::Api { status, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::MalformedResponse(format!("JSON: {}", err))
    }
}

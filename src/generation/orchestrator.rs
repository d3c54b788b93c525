//! The fallback orchestrator.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::validate::{normalize, validate};
use super::GenerationError;
use crate::config::Config;
use crate::models::{ContentKinds, ContentRequest, ExtractedText, ProviderKind, StudyMaterials};
use crate::providers::{Provider, ProviderError, ProviderPreference, ProviderRegistry};

/// Per-call timeout when none is configured
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(90);

/// Largest count accepted for any single content kind
pub const MAX_ITEMS_PER_KIND: usize = 50;

/// Lifecycle of one provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    NotStarted,
    InFlight,
    Succeeded,
    Failed,
}

/// Result of one provider call, used to decide whether to fall back
#[derive(Debug)]
pub enum ProviderOutcome {
    Success(StudyMaterials),
    Failure(ProviderError),
}

/// Record of one provider in the chain
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub provider: ProviderKind,
    pub state: CallState,
    /// Why the provider was skipped or failed
    pub failure: Option<String>,
    pub elapsed: Duration,
}

impl ProviderAttempt {
    fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            state: CallState::NotStarted,
            failure: None,
            elapsed: Duration::ZERO,
        }
    }
}

/// A successful generation and the attempts that led to it
#[derive(Debug, Clone)]
pub struct Generation {
    pub materials: StudyMaterials,
    pub attempts: Vec<ProviderAttempt>,
}

impl Generation {
    /// The provider that produced the materials
    pub fn provider(&self) -> ProviderKind {
        self.materials.provider
    }

    /// Attempts that failed before the successful one
    pub fn failures(&self) -> impl Iterator<Item = &ProviderAttempt> {
        self.attempts
            .iter()
            .filter(|a| a.state == CallState::Failed)
    }
}

/// Runs a provider chain until one produces valid study materials
#[derive(Debug, Clone)]
pub struct Orchestrator {
    chain: Vec<Arc<dyn Provider>>,
    call_timeout: Duration,
}

impl Orchestrator {
    /// Create an orchestrator over an explicit chain
    pub fn new(chain: Vec<Arc<dyn Provider>>) -> Self {
        Self {
            chain,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Build the chain from configured credentials and a preference
    pub fn from_config(config: &Config, preference: ProviderPreference) -> Self {
        let registry = ProviderRegistry::from_config(config);
        Self::new(registry.chain(preference))
            .with_timeout(Duration::from_secs(config.generation.timeout_secs))
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Providers in the order they will be tried
    pub fn chain(&self) -> Vec<ProviderKind> {
        self.chain.iter().map(|p| p.kind()).collect()
    }

    /// Generate study materials for a document.
    ///
    /// Fails only on bad input or when every provider in the chain failed.
    pub async fn generate(
        &self,
        document: &ExtractedText,
        request: &ContentRequest,
    ) -> Result<Generation, GenerationError> {
        if document.is_blank() {
            return Err(GenerationError::EmptyDocument(document.source_name()));
        }
        self.check_request(request)?;

        let mut attempts = Vec::with_capacity(self.chain.len());

        for provider in &self.chain {
            let mut attempt = ProviderAttempt::new(provider.kind());

            if !provider.supports(request) {
                tracing::debug!(provider = %provider.kind(), "Skipping provider without support for request");
                attempt.failure = Some("does not support the requested content".to_string());
                attempts.push(attempt);
                continue;
            }

            tracing::info!(provider = %provider.kind(), "Generating with {}", provider.name());
            attempt.state = CallState::InFlight;
            let started = Instant::now();

            let outcome = self.call(provider.as_ref(), document.text(), request).await;
            attempt.elapsed = started.elapsed();

            let result = match outcome {
                ProviderOutcome::Success(materials) => {
                    let materials = normalize(materials, request);
                    validate(&materials, request).map(|_| materials)
                }
                ProviderOutcome::Failure(err) => Err(err),
            };

            match result {
                Ok(mut materials) => {
                    attempt.state = CallState::Succeeded;
                    attempts.push(attempt);

                    materials.provider = provider.kind();
                    materials.generated_at = Utc::now();
                    materials.source = Some(document.source_name());

                    tracing::info!(
                        provider = %provider.kind(),
                        questions = materials.questions.len(),
                        flashcards = materials.flashcards.len(),
                        "Study materials generated"
                    );
                    return Ok(Generation {
                        materials,
                        attempts,
                    });
                }
                Err(err) => {
                    tracing::warn!(provider = %provider.kind(), "Provider failed: {}", err);
                    attempt.state = CallState::Failed;
                    attempt.failure = Some(err.to_string());
                    attempts.push(attempt);
                }
            }
        }

        tracing::error!("Every provider in the chain failed");
        Err(GenerationError::ChainExhausted { attempts })
    }

    async fn call(
        &self,
        provider: &dyn Provider,
        text: &str,
        request: &ContentRequest,
    ) -> ProviderOutcome {
        match tokio::time::timeout(self.call_timeout, provider.generate(text, request)).await {
            Ok(Ok(materials)) => ProviderOutcome::Success(materials),
            Ok(Err(err)) => ProviderOutcome::Failure(err),
            Err(_) => ProviderOutcome::Failure(ProviderError::Timeout(format!(
                "no response within {:?}",
                self.call_timeout
            ))),
        }
    }

    fn check_request(&self, request: &ContentRequest) -> Result<(), GenerationError> {
        if request.is_empty() {
            return Err(GenerationError::UnsupportedRequest(
                "the request asks for no content".to_string(),
            ));
        }

        let largest = request
            .multiple_choice
            .max(request.short_answer)
            .max(request.conceptual)
            .max(request.application)
            .max(request.flashcards);
        if largest > MAX_ITEMS_PER_KIND {
            return Err(GenerationError::UnsupportedRequest(format!(
                "at most {} items of each kind can be requested (got {})",
                MAX_ITEMS_PER_KIND, largest
            )));
        }

        let required = request.required_kinds();
        let supported = self
            .chain
            .iter()
            .fold(ContentKinds::empty(), |acc, p| acc | p.capabilities());
        if !self.chain.iter().any(|p| p.supports(request)) {
            let unsupported = required.difference(supported);
            return Err(GenerationError::UnsupportedRequest(if unsupported.is_empty() {
                "no single provider supports every requested content kind".to_string()
            } else {
                format!("no provider supports {:?}", unsupported)
            }));
        }

        Ok(())
    }
}

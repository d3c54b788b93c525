//! Study material generation with provider fallback.
//!
//! The [`Orchestrator`] tries each provider of a chain in order and returns
//! the first structurally valid result, tagged with the provider that made it.
//! Provider failures are recorded in the returned attempt log, never raised.

mod orchestrator;
mod validate;

pub use orchestrator::{
    CallState, Generation, Orchestrator, ProviderAttempt, ProviderOutcome, DEFAULT_CALL_TIMEOUT,
    MAX_ITEMS_PER_KIND,
};
pub use validate::{normalize, validate};

/// Fatal generation errors
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The document has no text to work from
    #[error("Document '{0}' contains no extractable text")]
    EmptyDocument(String),

    /// The request cannot be served by this chain
    #[error("Unsupported request: {0}")]
    UnsupportedRequest(String),

    /// Every provider failed, including the last one. Unreachable while the
    /// chain ends with the local template provider.
    #[error("Internal error: every provider failed ({})", summarize(.attempts))]
    ChainExhausted { attempts: Vec<ProviderAttempt> },
}

fn summarize(attempts: &[ProviderAttempt]) -> String {
    attempts
        .iter()
        .map(|a| match &a.failure {
            Some(reason) => format!("{}: {}", a.provider, reason),
            None => a.provider.to_string(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

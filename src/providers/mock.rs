//! Mock provider for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::models::{ContentKinds, ContentRequest, ProviderKind, StudyMaterials};
use crate::providers::{LocalTemplateProvider, Provider, ProviderError};

/// What the mock does when called
#[derive(Debug, Clone)]
enum Behavior {
    /// Answer like the local generator, attributed to the mock's kind
    Succeed,
    /// Return these materials as-is
    Respond(StudyMaterials),
    /// Fail with a network error carrying this message
    Fail(String),
    /// Sleep before answering
    Hang(Duration),
}

/// A provider for tests that returns scripted results and counts its calls.
#[derive(Debug)]
pub struct MockProvider {
    kind: ProviderKind,
    capabilities: ContentKinds,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockProvider {
    /// A mock that succeeds, attributing results to `kind`
    pub fn succeeding(kind: ProviderKind) -> Self {
        Self::with_behavior(kind, Behavior::Succeed)
    }

    /// A mock that always fails
    pub fn failing(kind: ProviderKind, message: impl Into<String>) -> Self {
        Self::with_behavior(kind, Behavior::Fail(message.into()))
    }

    /// A mock that returns fixed materials
    pub fn responding(kind: ProviderKind, materials: StudyMaterials) -> Self {
        Self::with_behavior(kind, Behavior::Respond(materials))
    }

    /// A mock that sleeps for `delay` before succeeding
    pub fn hanging(kind: ProviderKind, delay: Duration) -> Self {
        Self::with_behavior(kind, Behavior::Hang(delay))
    }

    fn with_behavior(kind: ProviderKind, behavior: Behavior) -> Self {
        Self {
            kind,
            capabilities: ContentKinds::all(),
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    /// Restrict the content kinds this mock claims to support
    pub fn with_capabilities(mut self, capabilities: ContentKinds) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Number of times `generate` was called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn name(&self) -> &str {
        "Mock Provider"
    }

    fn capabilities(&self) -> ContentKinds {
        self.capabilities
    }

    async fn generate(
        &self,
        text: &str,
        request: &ContentRequest,
    ) -> Result<StudyMaterials, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.behavior.clone() {
            Behavior::Succeed => Ok(self.templated(text, request)),
            Behavior::Respond(materials) => Ok(materials),
            Behavior::Fail(message) => Err(ProviderError::Network(message)),
            Behavior::Hang(delay) => {
                tokio::time::sleep(delay).await;
                Ok(self.templated(text, request))
            }
        }
    }
}

impl MockProvider {
    fn templated(&self, text: &str, request: &ContentRequest) -> StudyMaterials {
        let mut materials = LocalTemplateProvider::new().build(text, request);
        materials.provider = self.kind;
        materials
    }
}

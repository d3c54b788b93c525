//! Registry of configured providers and fallback chain construction.

use std::str::FromStr;
use std::sync::Arc;

use super::{
    ClaudeProvider, GeminiProvider, LocalTemplateProvider, OpenAiProvider, Provider, ProviderError,
};
use crate::config::Config;
use crate::models::ProviderKind;

/// Which provider the caller wants tried first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderPreference {
    /// Fixed priority order
    #[default]
    Auto,
    /// Move this provider to the front of the chain
    Prefer(ProviderKind),
}

impl FromStr for ProviderPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ProviderPreference::Auto),
            "gemini" | "google" => Ok(ProviderPreference::Prefer(ProviderKind::Gemini)),
            "claude" | "anthropic" => Ok(ProviderPreference::Prefer(ProviderKind::Claude)),
            "openai" | "gpt" => Ok(ProviderPreference::Prefer(ProviderKind::OpenAi)),
            "local" | "local-template" | "template" => {
                Ok(ProviderPreference::Prefer(ProviderKind::LocalTemplate))
            }
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// Providers available for generation, kept in priority order
///
/// The local template provider is always present.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// A registry holding only the local template provider
    pub fn new() -> Self {
        let local: Arc<dyn Provider> = Arc::new(LocalTemplateProvider::new());
        Self {
            providers: vec![local],
        }
    }

    /// Build every provider whose credentials are configured
    ///
    /// A remote provider that cannot be constructed is skipped with a warning.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();

        for kind in config.enabled_providers() {
            let Some(key) = config.api_keys.key_for(kind) else {
                continue;
            };
            match build_remote(kind, key, config) {
                Ok(provider) => registry.register(provider),
                Err(e) => tracing::warn!(provider = %kind, "Skipping provider: {}", e),
            }
        }

        tracing::debug!(
            providers = ?registry.kinds().collect::<Vec<_>>(),
            "Provider registry ready"
        );
        registry
    }

    /// Register a provider, replacing any existing one of the same kind
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let kind = provider.kind();
        self.providers.retain(|p| p.kind() != kind);
        self.providers.push(provider);
        self.providers.sort_by_key(|p| priority_of(p.kind()));
    }

    /// Get a provider by kind
    pub fn get(&self, kind: ProviderKind) -> Option<&Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.kind() == kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        self.providers.iter().map(|p| p.kind())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// The fallback chain for a preference
    ///
    /// A preferred provider moves to the front; preferring the local template
    /// yields a chain of just that provider. Preferring an unconfigured
    /// provider falls back to the automatic order.
    pub fn chain(&self, preference: ProviderPreference) -> Vec<Arc<dyn Provider>> {
        match preference {
            ProviderPreference::Auto => self.providers.clone(),
            ProviderPreference::Prefer(ProviderKind::LocalTemplate) => {
                let local = self
                    .get(ProviderKind::LocalTemplate)
                    .cloned()
                    .unwrap_or_else(|| Arc::new(LocalTemplateProvider::new()) as Arc<dyn Provider>);
                vec![local]
            }
            ProviderPreference::Prefer(kind) => match self.get(kind) {
                Some(preferred) => {
                    let mut chain = vec![Arc::clone(preferred)];
                    chain.extend(self.providers.iter().filter(|p| p.kind() != kind).cloned());
                    chain
                }
                None => {
                    tracing::warn!(
                        provider = %kind,
                        "{} is not configured (missing API key); using automatic order",
                        kind.name()
                    );
                    self.providers.clone()
                }
            },
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn priority_of(kind: ProviderKind) -> usize {
    ProviderKind::PRIORITY
        .iter()
        .position(|k| *k == kind)
        .unwrap_or(ProviderKind::PRIORITY.len())
}

fn build_remote(
    kind: ProviderKind,
    key: &str,
    config: &Config,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let settings = config.providers.settings_for(kind);
    let provider: Arc<dyn Provider> = match kind {
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(key, settings)?),
        ProviderKind::Claude => Arc::new(ClaudeProvider::new(key, settings)?),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(key, settings)?),
        ProviderKind::LocalTemplate => Arc::new(LocalTemplateProvider::new()),
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;

    fn kinds(chain: &[Arc<dyn Provider>]) -> Vec<ProviderKind> {
        chain.iter().map(|p| p.kind()).collect()
    }

    #[test]
    fn test_no_credentials_only_local() {
        let registry = ProviderRegistry::from_config(&Config::default());
        assert_eq!(registry.len(), 1);
        assert_eq!(
            kinds(&registry.chain(ProviderPreference::Auto)),
            vec![ProviderKind::LocalTemplate]
        );
    }

    #[test]
    fn test_from_config_priority_order() {
        let mut config = Config::default();
        config.api_keys.openai = Some("sk-test".to_string());
        config.api_keys.google = Some("g-test".to_string());
        config.api_keys.anthropic = Some("a-test".to_string());

        let registry = ProviderRegistry::from_config(&config);
        assert_eq!(
            kinds(&registry.chain(ProviderPreference::Auto)),
            vec![
                ProviderKind::Gemini,
                ProviderKind::Claude,
                ProviderKind::OpenAi,
                ProviderKind::LocalTemplate
            ]
        );
    }

    #[test]
    fn test_register_keeps_priority() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProvider::succeeding(ProviderKind::OpenAi)));
        registry.register(Arc::new(MockProvider::succeeding(ProviderKind::Gemini)));

        assert_eq!(
            registry.kinds().collect::<Vec<_>>(),
            vec![
                ProviderKind::Gemini,
                ProviderKind::OpenAi,
                ProviderKind::LocalTemplate
            ]
        );
    }

    #[test]
    fn test_preferred_moves_to_front() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProvider::succeeding(ProviderKind::Gemini)));
        registry.register(Arc::new(MockProvider::succeeding(ProviderKind::OpenAi)));

        let chain = registry.chain(ProviderPreference::Prefer(ProviderKind::OpenAi));
        assert_eq!(
            kinds(&chain),
            vec![
                ProviderKind::OpenAi,
                ProviderKind::Gemini,
                ProviderKind::LocalTemplate
            ]
        );
    }

    #[test]
    fn test_prefer_local_is_local_only() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProvider::succeeding(ProviderKind::Gemini)));

        let chain = registry.chain(ProviderPreference::Prefer(ProviderKind::LocalTemplate));
        assert_eq!(kinds(&chain), vec![ProviderKind::LocalTemplate]);
    }

    #[test]
    fn test_prefer_unconfigured_falls_back_to_auto() {
        let registry = ProviderRegistry::new();
        let chain = registry.chain(ProviderPreference::Prefer(ProviderKind::Claude));
        assert_eq!(kinds(&chain), vec![ProviderKind::LocalTemplate]);
    }

    #[test]
    fn test_parse_preference() {
        assert_eq!("auto".parse(), Ok(ProviderPreference::Auto));
        assert_eq!(
            "GPT".parse(),
            Ok(ProviderPreference::Prefer(ProviderKind::OpenAi))
        );
        assert_eq!(
            "local".parse(),
            Ok(ProviderPreference::Prefer(ProviderKind::LocalTemplate))
        );
        assert!("bard".parse::<ProviderPreference>().is_err());
    }
}

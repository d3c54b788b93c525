//! Configuration management.
//!
//! Configuration is an explicit [`Config`] value handed to the orchestrator.
//! It is loaded from an optional TOML file plus `STUDYKIT_`-prefixed
//! environment overrides, and provider credentials are read from
//! `GOOGLE_API_KEY`, `ANTHROPIC_API_KEY` and `OPENAI_API_KEY`.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api_keys]
//! google = "your-gemini-key"
//!
//! [providers.gemini]
//! model = "gemini-1.5-flash"
//! max_input_chars = 30000
//!
//! [providers.claude]
//! model = "claude-3-haiku-20240307"
//!
//! [generation]
//! timeout_secs = 90
//!
//! [generation.request]
//! multiple_choice = 4
//! flashcards = 10
//! summary_words = 150
//!
//! [extraction]
//! ocr = true
//! ocr_language = "eng"
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::{ContentRequest, ProviderKind};

/// Environment variable holding the Google Gemini API key
pub const GOOGLE_API_KEY_VAR: &str = "GOOGLE_API_KEY";
/// Environment variable holding the Anthropic API key
pub const ANTHROPIC_API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
/// Environment variable holding the OpenAI API key
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API keys for the remote providers
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Per-provider model and limits
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Generation settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Text extraction settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Default configuration with credentials taken from the environment
    pub fn from_env() -> Self {
        Self {
            api_keys: ApiKeys::from_env(),
            ..Self::default()
        }
    }

    /// Providers whose credentials are present, in priority order.
    ///
    /// The local template generator is always available and always last.
    pub fn enabled_providers(&self) -> Vec<ProviderKind> {
        ProviderKind::PRIORITY
            .into_iter()
            .filter(|kind| !kind.is_remote() || self.api_keys.key_for(*kind).is_some())
            .collect()
    }

    /// Render the configuration as TOML with API keys masked
    pub fn to_toml_redacted(&self) -> Result<String, ConfigError> {
        let mut redacted = self.clone();
        redacted.api_keys = self.api_keys.redacted();
        Ok(toml::to_string_pretty(&redacted)?)
    }
}

/// API keys for the remote providers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeys {
    /// Google Gemini
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google: Option<String>,

    /// Anthropic Claude
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<String>,

    /// OpenAI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
}

impl ApiKeys {
    /// Read the three provider keys from the process environment
    pub fn from_env() -> Self {
        Self {
            google: std::env::var(GOOGLE_API_KEY_VAR).ok(),
            anthropic: std::env::var(ANTHROPIC_API_KEY_VAR).ok(),
            openai: std::env::var(OPENAI_API_KEY_VAR).ok(),
        }
    }

    /// Fill keys missing from the file with the environment's
    pub fn or_env(self) -> Self {
        let env = Self::from_env();
        Self {
            google: self.google.or(env.google),
            anthropic: self.anthropic.or(env.anthropic),
            openai: self.openai.or(env.openai),
        }
    }

    /// The non-empty key for a remote provider, if any
    pub fn key_for(&self, kind: ProviderKind) -> Option<&str> {
        let key = match kind {
            ProviderKind::Gemini => self.google.as_deref(),
            ProviderKind::Claude => self.anthropic.as_deref(),
            ProviderKind::OpenAi => self.openai.as_deref(),
            ProviderKind::LocalTemplate => None,
        };
        key.map(str::trim).filter(|k| !k.is_empty())
    }

    fn redacted(&self) -> Self {
        let mask = |key: &Option<String>| key.as_ref().map(|_| "********".to_string());
        Self {
            google: mask(&self.google),
            anthropic: mask(&self.anthropic),
            openai: mask(&self.openai),
        }
    }
}

/// Settings for one remote provider; unset fields use the adapter's defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Input is truncated to this many characters before prompting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_input_chars: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    /// HTTP request timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Provider settings section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gemini: ProviderSettings,

    #[serde(default)]
    pub claude: ProviderSettings,

    #[serde(default)]
    pub openai: ProviderSettings,
}

impl ProvidersConfig {
    pub fn settings_for(&self, kind: ProviderKind) -> ProviderSettings {
        match kind {
            ProviderKind::Gemini => self.gemini.clone(),
            ProviderKind::Claude => self.claude.clone(),
            ProviderKind::OpenAi => self.openai.clone(),
            ProviderKind::LocalTemplate => ProviderSettings::default(),
        }
    }
}

/// Generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Per-provider call timeout enforced by the orchestrator
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Default content request
    #[serde(default)]
    pub request: ContentRequest,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            request: ContentRequest::default(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    90
}

/// Text extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// OCR scanned PDFs and embedded images
    #[serde(default = "default_true")]
    pub ocr: bool,

    /// Tesseract language code
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,

    /// Render resolution for OCR
    #[serde(default = "default_ocr_dpi")]
    pub ocr_dpi: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ocr: true,
            ocr_language: default_ocr_language(),
            ocr_dpi: default_ocr_dpi(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

fn default_ocr_dpi() -> u32 {
    300
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

fn builder() -> config::ConfigBuilder<config::builder::DefaultState> {
    config::Config::builder()
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("STUDYKIT")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let settings = builder()
        .add_source(config::File::from(path))
        .add_source(environment())
        .build()?;

    let mut config: Config = settings.try_deserialize()?;
    config.api_keys = config.api_keys.or_env();
    Ok(config)
}

/// Load configuration from the environment only
pub fn get_config() -> Result<Config, ConfigError> {
    let settings = builder().add_source(environment()).build()?;

    let mut config: Config = settings.try_deserialize()?;
    config.api_keys = config.api_keys.or_env();
    Ok(config)
}

/// Look for a configuration file in the usual locations
///
/// Checks `./studykit.toml`, then `<config dir>/studykit/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("studykit.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("studykit").join("config.toml"))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.generation.timeout_secs, 90);
        assert!(config.extraction.ocr);
        assert_eq!(config.extraction.ocr_language, "eng");
        assert_eq!(config.generation.request, ContentRequest::default());
    }

    #[test]
    fn test_enabled_providers_without_keys() {
        let config = Config::default();
        assert_eq!(
            config.enabled_providers(),
            vec![ProviderKind::LocalTemplate]
        );
    }

    #[test]
    fn test_enabled_providers_keeps_priority() {
        let mut config = Config::default();
        config.api_keys.openai = Some("sk-test".to_string());
        config.api_keys.google = Some("g-test".to_string());

        assert_eq!(
            config.enabled_providers(),
            vec![
                ProviderKind::Gemini,
                ProviderKind::OpenAi,
                ProviderKind::LocalTemplate
            ]
        );
    }

    #[test]
    fn test_blank_key_counts_as_absent() {
        let keys = ApiKeys {
            anthropic: Some("   ".to_string()),
            ..ApiKeys::default()
        };
        assert!(keys.key_for(ProviderKind::Claude).is_none());
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("studykit.toml");
        fs::write(
            &path,
            r#"
[api_keys]
anthropic = "file-key"

[providers.claude]
model = "claude-test"
max_input_chars = 1000

[generation]
timeout_secs = 5

[generation.request]
flashcards = 3

[extraction]
ocr = false
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.api_keys.anthropic.as_deref(), Some("file-key"));
        assert_eq!(config.providers.claude.model.as_deref(), Some("claude-test"));
        assert_eq!(config.providers.claude.max_input_chars, Some(1000));
        assert_eq!(config.generation.timeout_secs, 5);
        assert_eq!(config.generation.request.flashcards, 3);
        assert_eq!(config.generation.request.multiple_choice, 4);
        assert!(!config.extraction.ocr);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Path::new("/nonexistent/studykit.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_redacted_toml_hides_keys() {
        let mut config = Config::default();
        config.api_keys.google = Some("super-secret".to_string());

        let rendered = config.to_toml_redacted().unwrap();
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("********"));
    }
}

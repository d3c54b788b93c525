//! Google Gemini provider.
//!
//! Calls the `generateContent` endpoint with JSON response mode. The API key is
//! sent in the `x-goog-api-key` header so it never appears in request URLs or logs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{prompt, response, Provider, ProviderError};
use crate::config::ProviderSettings;
use crate::models::{ContentRequest, ProviderKind, StudyMaterials};
use crate::utils::{truncate_chars, HttpClient};

/// Google Gemini API provider
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    model: String,
    max_input_chars: usize,
    max_output_tokens: u32,
    client: HttpClient,
}

impl GeminiProvider {
    /// Default Gemini API base URL
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    /// Default model
    pub const DEFAULT_MODEL: &'static str = "gemini-2.5-flash";

    /// Input characters kept before truncation
    pub const DEFAULT_MAX_INPUT_CHARS: usize = 30_000;

    pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

    /// Creates a new Gemini provider
    pub fn new(api_key: &str, settings: ProviderSettings) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "Gemini API key cannot be empty".to_string(),
            ));
        }

        let timeout = Duration::from_secs(settings.timeout_secs.unwrap_or(120));
        let client = HttpClient::with_timeout(timeout).map_err(|e| {
            ProviderError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            api_key: api_key.trim().to_string(),
            base_url: settings
                .base_url
                .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
            model: settings
                .model
                .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            max_input_chars: settings
                .max_input_chars
                .unwrap_or(Self::DEFAULT_MAX_INPUT_CHARS),
            max_output_tokens: settings
                .max_output_tokens
                .unwrap_or(Self::DEFAULT_MAX_OUTPUT_TOKENS),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, user_prompt: String) -> Result<String, ProviderError> {
        let api_request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: user_prompt }],
            }],
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: prompt::SYSTEM_PROMPT.to_string(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: Some(0.3),
                max_output_tokens: Some(self.max_output_tokens),
                response_mime_type: Some("application/json".to_string()),
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&api_request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| match e.error.status {
                    Some(s) => format!("{} ({})", e.error.message, s),
                    None => e.error.message,
                })
                .unwrap_or(body);
            return Err(ProviderError::from_status(status.as_u16(), message));
        }

        let api_response: GenerateContentResponse = serde_json::from_str(&body)?;

        if let Some(reason) = api_response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: format!("Content blocked by Gemini safety filters: {}", reason),
            });
        }

        let candidate = api_response
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| {
                ProviderError::MalformedResponse("No candidates returned from Gemini".to_string())
            })?;

        if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
            tracing::debug!("Gemini response hit the output token limit");
        }

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::MalformedResponse(
                "Gemini returned an empty candidate".to_string(),
            ));
        }

        Ok(text)
    }
}

// =============================================================================
// Gemini API Types
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[async_trait]
impl Provider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn generate(
        &self,
        text: &str,
        request: &ContentRequest,
    ) -> Result<StudyMaterials, ProviderError> {
        let input = truncate_chars(text, self.max_input_chars);
        if input.len() < text.len() {
            tracing::debug!(
                kept = input.chars().count(),
                limit = self.max_input_chars,
                "Truncated document for Gemini"
            );
        }

        let raw = self.complete(prompt::build_prompt(input, request)).await?;
        response::parse_materials(&raw, ProviderKind::Gemini)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        let result = GeminiProvider::new("  ", ProviderSettings::default());
        assert!(matches!(result, Err(ProviderError::Configuration(_))));
    }

    #[test]
    fn test_defaults_applied() {
        let provider = GeminiProvider::new("key", ProviderSettings::default()).unwrap();
        assert_eq!(provider.model(), GeminiProvider::DEFAULT_MODEL);
        assert_eq!(provider.max_input_chars, 30_000);
        assert_eq!(provider.kind(), ProviderKind::Gemini);
    }

    #[test]
    fn test_settings_override_defaults() {
        let settings = ProviderSettings {
            model: Some("gemini-test".to_string()),
            max_input_chars: Some(10),
            ..ProviderSettings::default()
        };
        let provider = GeminiProvider::new("key", settings).unwrap();
        assert_eq!(provider.model(), "gemini-test");
        assert_eq!(provider.max_input_chars, 10);
    }

    fn provider_for(server: &mockito::ServerGuard) -> GeminiProvider {
        let settings = ProviderSettings {
            base_url: Some(server.url()),
            ..ProviderSettings::default()
        };
        GeminiProvider::new("test-key", settings).unwrap()
    }

    #[tokio::test]
    async fn test_generate_parses_candidate() {
        let mut server = mockito::Server::new_async().await;
        let materials_json = r#"{"flashcards":[{"front":"Heat","back":"Energy in transit"}],"summary":"Heat moves."}"#;
        let body = serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": materials_json}]},
                "finishReason": "STOP"
            }]
        });

        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let request = ContentRequest::empty().with_flashcards(1).with_summary(true);
        let materials = provider_for(&server)
            .generate("Heat flows from hot to cold.", &request)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(materials.provider, ProviderKind::Gemini);
        assert_eq!(materials.flashcards.len(), 1);
        assert_eq!(materials.summary, "Heat moves.");
    }

    #[tokio::test]
    async fn test_quota_error_maps_to_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .with_status(429)
            .with_body(r#"{"error":{"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#)
            .create_async()
            .await;

        let err = provider_for(&server)
            .generate("text", &ContentRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::RateLimited(ref m) if m.contains("Quota exceeded")));
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .with_status(200)
            .with_body(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .create_async()
            .await;

        let err = provider_for(&server)
            .generate("text", &ContentRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Api { .. }));
    }
}

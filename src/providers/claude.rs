//! Anthropic Claude provider (Messages API).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{prompt, response, Provider, ProviderError};
use crate::config::ProviderSettings;
use crate::models::{ContentRequest, ProviderKind, StudyMaterials};
use crate::utils::{truncate_chars, HttpClient};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude provider
#[derive(Debug, Clone)]
pub struct ClaudeProvider {
    api_key: String,
    base_url: String,
    model: String,
    max_input_chars: usize,
    max_output_tokens: u32,
    client: HttpClient,
}

impl ClaudeProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";

    pub const DEFAULT_MODEL: &'static str = "claude-haiku-4-5";

    /// Input characters kept before truncation
    pub const DEFAULT_MAX_INPUT_CHARS: usize = 20_000;

    pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;

    /// Creates a new Claude provider
    pub fn new(api_key: &str, settings: ProviderSettings) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "Anthropic API key cannot be empty".to_string(),
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
        let api_request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_output_tokens,
            system: prompt::SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: user_prompt,
            }],
        };

        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&api_request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| format!("{}: {}", e.error.error_type, e.error.message))
                .unwrap_or(body);
            return Err(ProviderError::from_status(status.as_u16(), message));
        }

        let api_response: MessagesResponse = serde_json::from_str(&body)?;

        if api_response.stop_reason.as_deref() == Some("max_tokens") {
            tracing::debug!("Claude response hit the output token limit");
        }

        let text: String = api_response
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.trim().is_empty() {
            return Err(ProviderError::MalformedResponse(
                "Claude returned no text content".to_string(),
            ));
        }

        Ok(text)
    }
}

// Anthropic API types

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

#[async_trait]
impl Provider for ClaudeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
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
                "Truncated document for Claude"
            );
        }

        let raw = self.complete(prompt::build_prompt(input, request)).await?;
        response::parse_materials(&raw, ProviderKind::Claude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_for(server: &mockito::ServerGuard) -> ClaudeProvider {
        let settings = ProviderSettings {
            base_url: Some(server.url()),
            ..ProviderSettings::default()
        };
        ClaudeProvider::new("sk-ant-test", settings).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let provider = ClaudeProvider::new("key", ProviderSettings::default()).unwrap();
        assert_eq!(provider.model(), "claude-haiku-4-5");
        assert_eq!(provider.max_input_chars, 20_000);
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(ClaudeProvider::new("", ProviderSettings::default()).is_err());
    }

    #[tokio::test]
    async fn test_generate_sends_headers_and_parses_text() {
        let mut server = mockito::Server::new_async().await;
        let materials_json = "```json\n{\"questions\":[{\"type\":\"conceptual\",\"question\":\"Why does heat flow?\",\"answer\":\"Temperature difference\"}]}\n```";
        let body = serde_json::json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": materials_json}],
            "stop_reason": "end_turn"
        });

        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-ant-test")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let request = ContentRequest::empty().with_questions(crate::models::QuestionKind::Conceptual, 1);
        let materials = provider_for(&server)
            .generate("Heat flows from hot to cold.", &request)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(materials.provider, ProviderKind::Claude);
        assert_eq!(materials.questions.len(), 1);
        assert_eq!(materials.questions[0].answer, "Temperature difference");
    }

    #[tokio::test]
    async fn test_invalid_key_maps_to_authentication() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .with_body(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
            .create_async()
            .await;

        let err = provider_for(&server)
            .generate("text", &ContentRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Authentication(ref m) if m.contains("invalid x-api-key")));
    }

    #[tokio::test]
    async fn test_prose_reply_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"Sorry, I can't do that."}]}"#)
            .create_async()
            .await;

        let err = provider_for(&server)
            .generate("text", &ContentRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }
}

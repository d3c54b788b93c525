//! OpenAI GPT provider (Chat Completions API with JSON mode).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{prompt, response, Provider, ProviderError};
use crate::config::ProviderSettings;
use crate::models::{ContentRequest, ProviderKind, StudyMaterials};
use crate::utils::{truncate_chars, HttpClient};

/// OpenAI provider
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    model: String,
    max_input_chars: usize,
    max_output_tokens: u32,
    client: HttpClient,
}

impl OpenAiProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    pub const DEFAULT_MODEL: &'static str = "gpt-4o";

    /// Input characters kept before truncation
    pub const DEFAULT_MAX_INPUT_CHARS: usize = 20_000;

    pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;

    /// Creates a new OpenAI provider
    pub fn new(api_key: &str, settings: ProviderSettings) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "OpenAI API key cannot be empty".to_string(),
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
        let api_request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt::SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: 0.3,
            max_tokens: self.max_output_tokens,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::from_status(status.as_u16(), message));
        }

        let api_response: ChatResponse = serde_json::from_str(&body)?;

        let choice = api_response.choices.into_iter().next().ok_or_else(|| {
            ProviderError::MalformedResponse("No choices returned from OpenAI".to_string())
        })?;

        if choice.finish_reason.as_deref() == Some("length") {
            tracing::debug!("OpenAI response hit the output token limit");
        }

        choice
            .message
            .content
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::MalformedResponse("OpenAI returned an empty message".to_string())
            })
    }
}

// OpenAI API types

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
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
                "Truncated document for OpenAI"
            );
        }

        let raw = self.complete(prompt::build_prompt(input, request)).await?;
        response::parse_materials(&raw, ProviderKind::OpenAi)
    }
}

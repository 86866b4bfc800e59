//! Gemini - Google Gemini API provider
//!
//! Implements [`ChatProvider`] against the Generative Language API using
//! reqwest. Supports text and inline image parts (multimodal verification).

use crate::completion::{CompletionRequest, CompletionResponse, TokenUsage};
use crate::error::{Error, Result};
use crate::message::{Message, MessageRole};
use crate::provider::ChatProvider;
use crate::util::{mask_api_key, truncate_safe};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Sanitize Gemini API error messages to prevent leaking sensitive information
fn sanitize_api_error(error: &str) -> String {
    let lower = error.to_lowercase();

    if lower.contains("api key")
        || lower.contains("apikey")
        || lower.contains("invalid key")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
        || lower.contains("permission denied")
    {
        return "API authentication error. Please check your API key configuration.".to_string();
    }

    if lower.contains("rate limit")
        || lower.contains("quota")
        || lower.contains("resource_exhausted")
    {
        return "API rate limit exceeded. Please try again later.".to_string();
    }

    if lower.contains("internal") || lower.contains("server error") {
        return "API server error. Please try again later.".to_string();
    }

    if error.len() > 300 {
        format!("{}...(truncated)", truncate_safe(error, 300))
    } else {
        error.to_string()
    }
}

/// Known-good Gemini models for this workload
pub const MODELS: &[&str] = &["gemini-2.5-pro", "gemini-2.5-flash", "gemini-2.0-flash"];

/// Default Gemini model (vision-capable)
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// Default API base URL
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: GeminiContent,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: u32,
    /// May be absent for empty/thinking-only responses
    #[serde(default)]
    candidates_token_count: Option<u32>,
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)] // Fields used by serde for JSON deserialization
struct GeminiErrorDetail {
    code: i32,
    message: String,
    status: String,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Gemini provider configuration
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key
    pub api_key: String,
    /// Base URL
    pub base_url: String,
    /// Default model
    pub default_model: String,
    /// Default max tokens
    pub default_max_tokens: u32,
    /// Request timeout
    pub timeout: Duration,
}

// SECURITY: Custom Debug implementation to mask credentials
impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiConfig {
    /// Create a new configuration with an API key
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            default_max_tokens: 8192,
            timeout: Duration::from_secs(60),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `GOOGLE_API_KEY` (preferred) or `GEMINI_API_KEY`, with optional
    /// `GEMINI_BASE_URL` / `GEMINI_MODEL` overrides.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .map_err(|_| {
                Error::NotConfigured("GOOGLE_API_KEY or GEMINI_API_KEY not set".to_string())
            })?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            config.default_model = model;
        }
        Ok(config)
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the default model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Google Gemini provider
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn convert_messages(request: &CompletionRequest) -> Vec<GeminiContent> {
        request
            .messages
            .iter()
            .map(|message| {
                let mut parts = Vec::new();
                if !message.content.is_empty() {
                    parts.push(GeminiPart::Text {
                        text: message.content.clone(),
                    });
                }
                if let Some(image) = &message.image {
                    parts.push(GeminiPart::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type.clone(),
                            data: image.data.clone(),
                        },
                    });
                }
                GeminiContent {
                    role: Some(gemini_role(message)),
                    parts,
                }
            })
            .collect()
    }

    fn build_request(&self, request: &CompletionRequest) -> GeminiRequest {
        GeminiRequest {
            contents: Self::convert_messages(request),
            system_instruction: request.system.as_ref().map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text { text: text.clone() }],
            }),
            generation_config: Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: Some(
                    request.max_tokens.unwrap_or(self.config.default_max_tokens),
                ),
            }),
        }
    }

    fn parse_response(model: &str, response: GeminiResponse) -> Result<CompletionResponse> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidResponse("no candidates in response".to_string()))?;

        let content: String = candidate
            .content
            .parts
            .iter()
            .filter_map(|part| match part {
                GeminiPart::Text { text } => Some(text.as_str()),
                GeminiPart::InlineData { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("");

        Ok(CompletionResponse {
            content,
            usage: response.usage_metadata.map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count.unwrap_or(0),
                total_tokens: u.total_token_count,
            }),
            finish_reason: candidate.finish_reason,
            model: model.to_string(),
        })
    }
}

/// Gemini uses "model" where the generic types use "assistant".
fn gemini_role(message: &Message) -> String {
    match message.role {
        MessageRole::Assistant => "model".to_string(),
        // Gemini has no system role inside contents; system text travels via
        // systemInstruction, so a stray system message degrades to user.
        MessageRole::System | MessageRole::User => "user".to_string(),
    }
}

#[async_trait::async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = if request.model.is_empty() {
            self.config.default_model.clone()
        } else {
            request.model.clone()
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, model, self.config.api_key
        );

        let body = self.build_request(&request);
        debug!(model = %model, messages = request.messages.len(), "Gemini request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(self.config.timeout.as_millis() as u64)
                } else {
                    Error::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                warn!(model = %model, "Gemini rate limit");
                return Err(Error::RateLimit);
            }
            let message = serde_json::from_str::<GeminiError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(Error::Api(format!(
                "{}: {}",
                status,
                sanitize_api_error(&message)
            )));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;

        Self::parse_response(&model, parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ImageData;

    #[test]
    fn test_config_debug_masks_key() {
        let config = GeminiConfig::new("super-secret-api-key");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret-api-key"));
        assert!(debug.contains("supe...-key"));
    }

    #[test]
    fn test_sanitize_api_error() {
        let sanitized = sanitize_api_error("API key not valid. Please pass a valid API key.");
        assert!(!sanitized.contains("API key not valid"));

        let quota = sanitize_api_error("RESOURCE_EXHAUSTED: quota exceeded");
        assert!(quota.contains("rate limit"));

        assert_eq!(sanitize_api_error("model not found"), "model not found");
    }

    #[test]
    fn test_convert_messages_roles_and_images() {
        let request = CompletionRequest::new(DEFAULT_MODEL)
            .with_message(Message::user("generate checkpoints"))
            .with_message(Message::assistant("{\"checkpoints\": []}"))
            .with_message(Message::user_with_image(
                "verify",
                ImageData::from_bytes("image/png", &[1, 2, 3]),
            ));

        let contents = GeminiProvider::convert_messages(&request);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0].role.as_deref(), Some("user"));
        assert_eq!(contents[1].role.as_deref(), Some("model"));
        assert_eq!(contents[2].parts.len(), 2);
    }

    #[test]
    fn test_parse_response() {
        let json = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "hello"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 10,
                "candidatesTokenCount": 2,
                "totalTokenCount": 12
            }
        }"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        let completion = GeminiProvider::parse_response("gemini-2.5-pro", response).unwrap();
        assert_eq!(completion.content, "hello");
        assert_eq!(completion.usage.unwrap().total_tokens, 12);
        assert_eq!(completion.finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_parse_response_no_candidates() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        let err = GeminiProvider::parse_response("gemini-2.5-pro", response).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[test]
    fn test_request_serialization_camel_case() {
        let provider_request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart::Text {
                    text: "hi".to_string(),
                }],
            }],
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text {
                    text: "be terse".to_string(),
                }],
            }),
            generation_config: Some(GenerationConfig {
                temperature: Some(0.1),
                max_output_tokens: Some(256),
            }),
        };
        let json = serde_json::to_string(&provider_request).unwrap();
        assert!(json.contains("\"systemInstruction\""));
        assert!(json.contains("\"maxOutputTokens\""));
    }
}

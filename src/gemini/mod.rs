//! Client for the Gemini `generateContent` endpoint.
//!
//! Only the slice of the wire format this application needs is modeled:
//! text-only contents in, first-candidate text out.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::GenerationError;
use crate::transport::{HttpMethod, HttpRequest, HttpTransport};

/// A piece of generated or prompted content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Part {
    /// Text payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A role-tagged list of parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Content {
    /// "user" or "model".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts.
    pub parts: Vec<Part>,
}

impl Content {
    /// A single-part user message.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }
}

/// Request body for `generateContent`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// The conversation contents.
    pub contents: Vec<Content>,
}

/// One candidate answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    /// Why generation stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Feedback about the prompt itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Set when the prompt was blocked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

/// Response body for `generateContent`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Candidate answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<Candidate>>,
    /// Prompt feedback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// A service that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates text for a single prompt. The result is trimmed of
    /// surrounding whitespace.
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Gemini-backed implementation of [`TextGenerator`].
pub struct GeminiClient {
    config: Arc<AppConfig>,
    transport: Arc<dyn HttpTransport>,
}

impl GeminiClient {
    /// Create a new client over the given transport.
    pub fn new(config: Arc<AppConfig>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    fn endpoint(&self) -> Result<String, GenerationError> {
        let path = format!(
            "{}/models/{}:generateContent",
            self.config.api_version, self.config.model
        );
        let url = self.config.base_url.join(&path)?;
        Ok(url.to_string())
    }

    fn build_request(&self, prompt: &str) -> Result<HttpRequest, GenerationError> {
        let body = GenerateContentRequest {
            contents: vec![Content::user_text(prompt)],
        };

        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert(
            "x-goog-api-key".to_string(),
            self.config.api_key.expose_secret().to_string(),
        );

        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.endpoint()?,
            headers,
            body: Some(Bytes::from(serde_json::to_vec(&body)?)),
        })
    }

    fn extract_text(response: GenerateContentResponse) -> Result<String, GenerationError> {
        if let Some(feedback) = &response.prompt_feedback {
            if let Some(reason) = &feedback.block_reason {
                return Err(GenerationError::Blocked {
                    reason: reason.clone(),
                });
            }
        }

        let candidate = response
            .candidates
            .and_then(|mut c| if c.is_empty() { None } else { Some(c.remove(0)) })
            .ok_or(GenerationError::EmptyResponse)?;

        if matches!(candidate.finish_reason.as_deref(), Some("SAFETY")) {
            return Err(GenerationError::Blocked {
                reason: "SAFETY".to_string(),
            });
        }

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }

    fn map_failure(status: u16, body: &[u8]) -> GenerationError {
        let message = serde_json::from_slice::<ApiErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .and_then(|e| e.message)
            .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

        GenerationError::Api { status, message }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = self.build_request(prompt)?;

        tracing::debug!(model = %self.config.model, "sending generateContent request");
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            tracing::warn!(status = response.status, "generation request failed");
            return Err(Self::map_failure(response.status, &response.body));
        }

        let parsed: GenerateContentResponse = serde_json::from_slice(&response.body)?;
        Self::extract_text(parsed)
    }
}

//! Google Gemini driver over the `generateContent` REST endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{AiError, ChatModel, Completion};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: &'static str,
    pub timeout: Duration,
}

impl GeminiSettings {
    /// Settings for the conversational model (plain-text replies).
    pub fn chat(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            response_mime_type: "text/plain",
            timeout: Duration::from_secs(120),
        }
    }

    /// Settings for the code model; asks for a JSON response body.
    pub fn code(api_key: impl Into<String>) -> Self {
        Self {
            response_mime_type: "application/json",
            ..Self::chat(api_key)
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiModel {
    settings: GeminiSettings,
    client: Client,
}

impl GeminiModel {
    pub fn new(settings: GeminiSettings) -> Result<Self, AiError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { settings, client })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

#[async_trait]
impl ChatModel for GeminiModel {
    async fn send_message(&self, prompt: &str) -> Result<Completion, AiError> {
        let body = serde_json::json!({
            "contents": [
                { "role": "user", "parts": [{ "text": prompt }] }
            ],
            "generationConfig": {
                "temperature": self.settings.temperature,
                "topP": self.settings.top_p,
                "topK": self.settings.top_k,
                "maxOutputTokens": self.settings.max_output_tokens,
                "responseMimeType": self.settings.response_mime_type,
            }
        });

        let response = self
            .client
            .post(self.api_url())
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini returned HTTP {}", status);
            return Err(AiError::Status { status, body });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let completion = parsed.into_completion()?;
        debug!(
            "Gemini reply: {} chars, {:?} tokens",
            completion.text.len(),
            completion.total_tokens
        );
        Ok(completion)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u32>,
}

impl GenerateContentResponse {
    /// Concatenate the text parts of the first candidate.
    fn into_completion(self) -> Result<Completion, AiError> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AiError::EmptyResponse);
        }

        Ok(Completion {
            text,
            total_tokens: self.usage_metadata.and_then(|u| u.total_token_count),
        })
    }
}

//! OpenAI-compatible chat completions provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::traits::LlmProvider;
use crate::domain::types::ChatMessage;
use crate::infrastructure::http::{error_text, http_client};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// OpenAI API request format
#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// OpenAI API response format
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, base_url: Option<&str>, model: &str) -> Self {
        Self {
            api_key: api_key.trim().to_string(),
            base_url: base_url
                .unwrap_or(DEFAULT_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn completion(&self, messages: &[ChatMessage]) -> Result<String, String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = OpenAIRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|msg| OpenAIMessage {
                    role: msg.role.as_str(),
                    content: &msg.content,
                })
                .collect(),
            max_tokens: 1000,
            temperature: 0.7,
        };

        let response = http_client()
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        if !response.status().is_success() {
            let (status, message) = error_text(response).await;
            tracing::warn!("OpenAI request failed with {}: {}", status, message);
            return Err(if status.as_u16() == 429 && !message.contains("429") {
                format!("429 rate limit: {}", message)
            } else {
                message
            });
        }

        let parsed: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

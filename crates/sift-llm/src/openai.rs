//! OpenAI-compatible chat completions provider
//!
//! Works against any endpoint that speaks `/v1/chat/completions` with bearer
//! authentication. A per-call `credential_override` takes precedence over
//! the configured key; a call with neither fails with [`LlmError::Credential`]
//! before any request is sent.

use crate::{GenerationOptions, LlmError, Message, TextGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Provider for OpenAI-compatible chat APIs
#[derive(Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessageResp,
}

#[derive(Deserialize)]
struct ChatMessageResp {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    /// Create a provider
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            max_retries: 3,
        }
    }

    /// Set the maximum number of attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    fn resolve_key<'a>(&'a self, options: &'a GenerationOptions) -> Result<&'a str, LlmError> {
        options
            .credential_override
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .or(self.api_key.as_deref())
            .ok_or_else(|| LlmError::Credential("no API key available".to_string()))
    }

    async fn attempt(
        &self,
        key: &str,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(key)
            .timeout(Duration::from_millis(options.timeout_ms))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(options.timeout_ms)
                } else {
                    LlmError::Network(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status.as_u16(), &text));
        }

        let parsed: ChatApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl TextGenerator for OpenAiProvider {
    async fn generate(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let key = self.resolve_key(options)?;
        let mut attempts = 0;
        loop {
            match self.attempt(key, messages, options).await {
                Ok(text) => {
                    debug!("Chat completion returned {} chars", text.len());
                    return Ok(text);
                }
                Err(e) if e.is_transient() && attempts + 1 < self.max_retries => {
                    attempts += 1;
                    let delay = Duration::from_secs(2u64.pow(attempts - 1));
                    warn!("Chat completion failed ({}), retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_credential_error() {
        let provider = OpenAiProvider::new(DEFAULT_BASE_URL, "gpt-4o-mini", None);
        let result = provider
            .generate(&[Message::user("hi")], &GenerationOptions::default())
            .await;
        assert!(result.unwrap_err().is_credential());
    }

    #[test]
    fn test_override_takes_precedence() {
        let provider = OpenAiProvider::new(DEFAULT_BASE_URL, "m", Some("configured".into()));
        let options = GenerationOptions {
            credential_override: Some("override".into()),
            ..Default::default()
        };
        assert_eq!(provider.resolve_key(&options).unwrap(), "override");

        let blank = GenerationOptions {
            credential_override: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(provider.resolve_key(&blank).unwrap(), "configured");
    }

    #[test]
    fn test_blank_configured_key_is_ignored() {
        let provider = OpenAiProvider::new("http://x/", "m", Some(String::new()));
        assert_eq!(provider.base_url, "http://x");
        assert!(provider.resolve_key(&GenerationOptions::default()).is_err());
    }
}

//! Sift LLM Provider Layer
//!
//! The text-generation boundary the extraction pipeline depends on but does
//! not implement.
//!
//! # Architecture
//!
//! This crate defines the [`TextGenerator`] trait plus a typed [`LlmError`]
//! that distinguishes credential, rate-limit, network/timeout and empty
//! response failures, so callers can decide which failures abort a document
//! and which merely skip one call.
//!
//! # Providers
//!
//! - `MockGenerator`: Scripted generator for testing
//! - `OllamaProvider`: Local Ollama chat API
//! - `OpenAiProvider`: Any OpenAI-compatible chat completions endpoint
//!
//! # Examples
//!
//! ```
//! use sift_llm::{GenerationOptions, Message, MockGenerator, TextGenerator};
//!
//! # async fn example() {
//! let generator = MockGenerator::new("Hello from LLM!");
//! let reply = generator
//!     .generate(&[Message::user("test prompt")], &GenerationOptions::default())
//!     .await
//!     .unwrap();
//! assert_eq!(reply, "Hello from LLM!");
//! # }
//! ```

#![warn(missing_docs)]

pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Errors that can occur during text generation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Missing, invalid or revoked credential
    #[error("Credential error: {0}")]
    Credential(String),

    /// Rate limit or quota exhausted
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Network or API communication error
    #[error("Communication error: {0}")]
    Network(String),

    /// The call did not finish in time
    #[error("Generation timed out after {0} ms")]
    Timeout(u64),

    /// The provider answered with no text
    #[error("Empty response from model")]
    EmptyResponse,

    /// Invalid response envelope from the provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Whether the failure is caused by credentials
    pub fn is_credential(&self) -> bool {
        matches!(self, LlmError::Credential(_))
    }

    /// Whether the failure is caused by rate limiting or quota
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LlmError::RateLimited(_))
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Network(_) | LlmError::Timeout(_))
    }

    /// Map an HTTP failure status to an error
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = format!("HTTP {}: {}", status, body);
        match status {
            401 | 403 => LlmError::Credential(detail),
            429 => LlmError::RateLimited(detail),
            404 => LlmError::ModelNotAvailable(detail),
            408 | 504 => LlmError::Network(detail),
            s if s >= 500 => LlmError::Network(detail),
            _ => LlmError::Other(detail),
        }
    }
}

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions
    System,
    /// Request content
    User,
    /// Model output
    Assistant,
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author
    pub role: Role,
    /// Text
    pub content: String,
}

impl Message {
    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Per-call generation options
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Call timeout in milliseconds
    pub timeout_ms: u64,
    /// Credential to use instead of the provider's configured one
    pub credential_override: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.3,
            timeout_ms: 120_000,
            credential_override: None,
        }
    }
}

/// Text-generation capability
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the conversation
    async fn generate(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<String, LlmError>;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn generate(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        (**self).generate(messages, options).await
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock text generator for deterministic testing
///
/// Replies are chosen in order from: queued replies (FIFO), rules matching a
/// substring of the last message, and finally the default reply. No network
/// calls are made.
///
/// # Examples
///
/// ```
/// use sift_llm::{GenerationOptions, LlmError, Message, MockGenerator, TextGenerator};
///
/// # async fn example() {
/// let generator = MockGenerator::new("[]");
/// generator.push_error(LlmError::EmptyResponse);
/// generator.add_response("alpha", "matched");
///
/// let opts = GenerationOptions::default();
/// assert!(generator.generate(&[Message::user("x")], &opts).await.is_err());
/// assert_eq!(generator.generate(&[Message::user("alpha")], &opts).await.unwrap(), "matched");
/// assert_eq!(generator.generate(&[Message::user("beta")], &opts).await.unwrap(), "[]");
/// assert_eq!(generator.call_count(), 3);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockGenerator {
    default_response: String,
    queued: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
    rules: Arc<Mutex<Vec<(String, Result<String, LlmError>)>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    options: Arc<Mutex<Vec<GenerationOptions>>>,
}

impl MockGenerator {
    /// Create a generator with a fixed default reply
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            queued: Arc::new(Mutex::new(VecDeque::new())),
            rules: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            options: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a reply for the next unmatched call
    pub fn push_response(&self, response: impl Into<String>) {
        lock(&self.queued).push_back(Ok(response.into()));
    }

    /// Queue a failure for the next unmatched call
    pub fn push_error(&self, error: LlmError) {
        lock(&self.queued).push_back(Err(error));
    }

    /// Reply with `response` whenever the last message contains `needle`
    pub fn add_response(&self, needle: impl Into<String>, response: impl Into<String>) {
        lock(&self.rules).push((needle.into(), Ok(response.into())));
    }

    /// Fail with `error` whenever the last message contains `needle`
    pub fn add_error(&self, needle: impl Into<String>, error: LlmError) {
        lock(&self.rules).push((needle.into(), Err(error)));
    }

    /// Number of generate calls so far
    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// Last-message text of every call so far
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Options passed to every call so far
    pub fn recorded_options(&self) -> Vec<GenerationOptions> {
        lock(&self.options).clone()
    }

    /// Forget recorded calls
    pub fn reset_call_count(&self) {
        lock(&self.prompts).clear();
        lock(&self.options).clear();
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        lock(&self.prompts).push(prompt.clone());
        lock(&self.options).push(options.clone());

        if let Some(reply) = lock(&self.queued).pop_front() {
            return reply;
        }

        let rules = lock(&self.rules);
        if let Some((_, reply)) = rules.iter().find(|(needle, _)| prompt.contains(needle.as_str())) {
            return reply.clone();
        }

        Ok(self.default_response.clone())
    }
}

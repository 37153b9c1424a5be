//! Text-generation provider selection.

use crate::config::{ProviderConfig, ProviderKind};
use async_trait::async_trait;
use sift_llm::{
    ollama, openai, GenerationOptions, LlmError, Message, OllamaProvider, OpenAiProvider,
    TextGenerator,
};
use std::sync::Arc;

/// The configured backend.
pub enum Provider {
    /// Local Ollama server
    Ollama(OllamaProvider),
    /// OpenAI-compatible endpoint
    OpenAi(OpenAiProvider),
}

impl Provider {
    /// Build the configured provider.
    ///
    /// A missing API key is not an error here: providers that need one report
    /// a credential failure on the first call, which the pipeline handles.
    pub fn from_config(config: &ProviderConfig) -> Self {
        match config.kind {
            ProviderKind::Ollama => {
                let endpoint = config.endpoint.as_deref().unwrap_or(ollama::DEFAULT_ENDPOINT);
                Provider::Ollama(OllamaProvider::new(endpoint, &config.model))
            }
            ProviderKind::OpenAi => {
                let endpoint = config.endpoint.as_deref().unwrap_or(openai::DEFAULT_BASE_URL);
                Provider::OpenAi(OpenAiProvider::new(endpoint, &config.model, config.api_key()))
            }
        }
    }
}

#[async_trait]
impl TextGenerator for Provider {
    async fn generate(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        match self {
            Provider::Ollama(p) => p.generate(messages, options).await,
            Provider::OpenAi(p) => p.generate(messages, options).await,
        }
    }
}

/// Shared handle to the configured provider.
pub fn build_generator(config: &ProviderConfig) -> Arc<Provider> {
    Arc::new(Provider::from_config(config))
}

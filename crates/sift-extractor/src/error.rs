//! Error types for the Extractor

use sift_llm::LlmError;
use thiserror::Error;

/// Errors that can occur during extraction
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// The provider rejected or lacked a credential
    #[error("Credential error: {0}")]
    Credential(String),

    /// The provider's rate limit or quota is exhausted
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Any other generation failure
    #[error("LLM error: {0}")]
    Llm(String),

    /// Generation did not finish in time
    #[error("Extraction timeout")]
    Timeout,

    /// A chunk failed; the chunk is skipped
    #[error("Chunk {index} failed: {reason}")]
    ChunkProcessing {
        /// Zero-based chunk index
        index: usize,
        /// Failure description
        reason: String,
    },

    /// The model response could not be repaired into items
    #[error("Invalid response format: {0}")]
    ResponseFormat(String),

    /// Persistence error
    #[error("Store error: {0}")]
    Store(String),

    /// A draft is missing required fields
    #[error("Validation error: {0}")]
    Validation(String),

    /// The request itself cannot be processed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExtractorError {
    /// Whether the error must abort the whole document
    pub fn aborts_document(&self) -> bool {
        matches!(self, ExtractorError::Credential(_))
    }

    /// Short message suitable for a user-facing status line
    pub fn user_message(&self) -> &'static str {
        match self {
            ExtractorError::Credential(_) => "credential rejected",
            ExtractorError::RateLimited(_) => "rate limited",
            ExtractorError::Llm(_) | ExtractorError::Timeout => "generation failed",
            ExtractorError::ChunkProcessing { .. } => "chunk failed",
            ExtractorError::ResponseFormat(_) => "unreadable model response",
            ExtractorError::Store(_) => "storage unavailable",
            ExtractorError::Validation(_) => "invalid item",
            ExtractorError::InvalidRequest(_) => "invalid request",
            ExtractorError::Config(_) => "configuration error",
        }
    }
}

impl From<LlmError> for ExtractorError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Credential(msg) => ExtractorError::Credential(msg),
            LlmError::RateLimited(msg) => ExtractorError::RateLimited(msg),
            LlmError::Timeout(_) => ExtractorError::Timeout,
            other => ExtractorError::Llm(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::ResponseFormat(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_mapping() {
        let e: ExtractorError = LlmError::Credential("bad key".into()).into();
        assert!(matches!(e, ExtractorError::Credential(_)));
        assert!(e.aborts_document());

        let e: ExtractorError = LlmError::RateLimited("429".into()).into();
        assert!(matches!(e, ExtractorError::RateLimited(_)));
        assert!(!e.aborts_document());

        let e: ExtractorError = LlmError::Timeout(10).into();
        assert!(matches!(e, ExtractorError::Timeout));

        let e: ExtractorError = LlmError::EmptyResponse.into();
        assert!(matches!(e, ExtractorError::Llm(_)));
    }

    #[test]
    fn test_malformed_item_is_a_response_format_error() {
        let e: ExtractorError = serde_json::from_str::<serde_json::Value>("{\"title\":")
            .unwrap_err()
            .into();
        assert!(matches!(e, ExtractorError::ResponseFormat(_)));
        assert_eq!(e.user_message(), "unreadable model response");
        assert!(!e.aborts_document());
    }
}

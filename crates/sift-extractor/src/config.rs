//! Configuration for the Extractor

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Maximum chunk size (UTF-8 bytes)
    pub chunk_size: usize,

    /// Bytes shared by consecutive chunks
    pub chunk_overlap: usize,

    /// How far back from a raw cut to look for a paragraph/heading/list break
    pub boundary_search_window: usize,

    /// Pause between consecutive chunk calls (milliseconds)
    pub chunk_delay_ms: u64,

    /// Items persisted concurrently per sub-batch
    pub save_batch_size: usize,

    /// Token budget per generation call
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum time for one provider attempt (seconds)
    pub generation_timeout_secs: u64,

    /// Maximum time for a whole generation call, provider retries and
    /// backoff included (seconds)
    pub call_budget_secs: u64,
}

impl ExtractorConfig {
    /// Get the per-attempt generation timeout as a Duration
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    /// Get the whole-call budget as a Duration
    pub fn call_budget(&self) -> Duration {
        Duration::from_secs(self.call_budget_secs)
    }

    /// Get the inter-chunk delay as a Duration
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }
        if self.save_batch_size == 0 {
            return Err("save_batch_size must be greater than 0".to_string());
        }
        if self.generation_timeout_secs == 0 {
            return Err("generation_timeout_secs must be greater than 0".to_string());
        }
        if self.call_budget_secs < self.generation_timeout_secs {
            return Err(format!(
                "call_budget_secs ({}) must be at least generation_timeout_secs ({})",
                self.call_budget_secs, self.generation_timeout_secs
            ));
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!("temperature {} out of range [0, 2]", self.temperature));
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            chunk_size: 20_000,
            chunk_overlap: 1_000,
            boundary_search_window: 500,
            chunk_delay_ms: 500,
            save_batch_size: 5,
            max_tokens: 4_096,
            temperature: 0.3,
            generation_timeout_secs: 120,
            call_budget_secs: 600,
        }
    }
}

impl ExtractorConfig {
    /// Aggressive preset: smaller chunks and shorter timeouts
    pub fn aggressive() -> Self {
        Self {
            chunk_size: 8_000,
            chunk_overlap: 400,
            generation_timeout_secs: 60,
            call_budget_secs: 240,
            max_tokens: 2_048,
            ..Self::default()
        }
    }

    /// Lenient preset: larger chunks, longer timeouts, gentler pacing
    pub fn lenient() -> Self {
        Self {
            chunk_size: 40_000,
            chunk_overlap: 2_000,
            chunk_delay_ms: 1_000,
            generation_timeout_secs: 300,
            call_budget_secs: 1_200,
            max_tokens: 8_192,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(ExtractorConfig::default().validate().is_ok());
        assert!(ExtractorConfig::aggressive().validate().is_ok());
        assert!(ExtractorConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_invalid_chunk_size() {
        let config = ExtractorConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_batch_size() {
        let config = ExtractorConfig {
            save_batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_budget_shorter_than_attempt_is_rejected() {
        let config = ExtractorConfig {
            generation_timeout_secs: 120,
            call_budget_secs: 60,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("call_budget_secs"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig::lenient();
        let toml_str = config.to_toml().unwrap();
        let parsed = ExtractorConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = ExtractorConfig::from_toml("chunk_size = 1234").unwrap();
        assert_eq!(parsed.chunk_size, 1234);
        assert_eq!(parsed.chunk_overlap, ExtractorConfig::default().chunk_overlap);
    }
}

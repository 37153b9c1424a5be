//! Configuration for the similarity engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the similarity engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Cheap-signal score (0-100) at or above which no generation call is made
    pub fast_path_threshold: f64,

    /// Characters of `title + content` sent per item for semantic rating
    pub max_text_chars: usize,

    /// Items are only compared with neighbours this many positions away
    pub graph_window: usize,

    /// Minimum score for a graph edge
    pub graph_min_similarity: u8,

    /// Token budget for a rating call
    pub max_tokens: u32,

    /// Maximum time for a rating call, provider retries included (seconds)
    pub timeout_secs: u64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            fast_path_threshold: 70.0,
            max_text_chars: 2_000,
            graph_window: 3,
            graph_min_similarity: 30,
            max_tokens: 16,
            timeout_secs: 30,
        }
    }
}

impl SimilarityConfig {
    /// Aggressive preset: fewer generation calls, smaller neighbourhoods
    pub fn aggressive() -> Self {
        Self {
            fast_path_threshold: 50.0,
            max_text_chars: 1_000,
            graph_window: 2,
            timeout_secs: 15,
            ..Self::default()
        }
    }

    /// Lenient preset: rate more pairs semantically over wider neighbourhoods
    pub fn lenient() -> Self {
        Self {
            fast_path_threshold: 90.0,
            max_text_chars: 4_000,
            graph_window: 5,
            graph_min_similarity: 20,
            timeout_secs: 60,
            ..Self::default()
        }
    }

    /// Get the rating timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.fast_path_threshold) {
            return Err(format!(
                "fast_path_threshold {} out of range [0, 100]",
                self.fast_path_threshold
            ));
        }
        if self.graph_min_similarity > 100 {
            return Err(format!(
                "graph_min_similarity {} out of range [0, 100]",
                self.graph_min_similarity
            ));
        }
        if self.max_text_chars == 0 {
            return Err("max_text_chars must be greater than 0".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        Ok(())
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

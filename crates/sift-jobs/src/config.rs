//! Configuration for background jobs

use serde::{Deserialize, Serialize};
use sift_domain::progress::{ETA_CEILING_SECS, HISTORY_WINDOW};
use std::time::Duration;

/// Configuration for the job runner
///
/// # Examples
///
/// ```
/// use sift_jobs::JobConfig;
///
/// let config = JobConfig::default();
/// assert_eq!(config.history_window, 5);
///
/// let config = JobConfig::aggressive();
/// assert_eq!(config.poll_interval_ms, 200);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Most recent progress samples used for the ETA
    pub history_window: usize,

    /// ETA projections above this many seconds are discarded
    pub eta_ceiling_secs: f64,

    /// How often waiters poll the task store (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            history_window: HISTORY_WINDOW,
            eta_ceiling_secs: ETA_CEILING_SECS,
            poll_interval_ms: 500,
        }
    }
}

impl JobConfig {
    /// Aggressive preset: short history and fast polling
    pub fn aggressive() -> Self {
        Self {
            history_window: 3,
            eta_ceiling_secs: 1_800.0,
            poll_interval_ms: 200,
        }
    }

    /// Lenient preset: slower polling and a longer ETA horizon
    pub fn lenient() -> Self {
        Self {
            history_window: HISTORY_WINDOW,
            eta_ceiling_secs: 7_200.0,
            poll_interval_ms: 1_000,
        }
    }

    /// Get the poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(2..=HISTORY_WINDOW).contains(&self.history_window) {
            return Err(format!(
                "history_window must be between 2 and {}",
                HISTORY_WINDOW
            ));
        }
        if !self.eta_ceiling_secs.is_finite() || self.eta_ceiling_secs <= 0.0 {
            return Err("eta_ceiling_secs must be a positive number".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".to_string());
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(JobConfig::default().validate().is_ok());
        assert!(JobConfig::aggressive().validate().is_ok());
        assert!(JobConfig::lenient().validate().is_ok());
        assert!(JobConfig::aggressive().poll_interval() < JobConfig::lenient().poll_interval());
    }

    #[test]
    fn test_history_window_bounds() {
        for window in [0, 1, HISTORY_WINDOW + 1] {
            let config = JobConfig {
                history_window: window,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "window {}", window);
        }
    }

    #[test]
    fn test_invalid_ceiling() {
        let config = JobConfig {
            eta_ceiling_secs: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = JobConfig::lenient();
        let parsed = JobConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, parsed);

        let partial = JobConfig::from_toml("poll_interval_ms = 50").unwrap();
        assert_eq!(partial.poll_interval(), Duration::from_millis(50));
        assert_eq!(partial.history_window, HISTORY_WINDOW);
    }
}

//! Configuration for the Extractor

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Extractor
///
/// No timeout or retry is applied by default: bounding the generation call
/// is an explicit caller decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Maximum input text length (characters)
    pub max_input_length: usize,

    /// Upper bound on a single generation call (seconds); unset means none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_timeout_secs: Option<u64>,
}

impl ExtractorConfig {
    /// Get the generation timeout as a Duration, if one is configured
    pub fn generation_timeout(&self) -> Option<Duration> {
        self.generation_timeout_secs.map(Duration::from_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_input_length == 0 {
            return Err("max_input_length must be greater than 0".to_string());
        }
        if self.generation_timeout_secs == Some(0) {
            return Err("generation_timeout_secs must be greater than 0 when set".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_input_length: 50_000,
            generation_timeout_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExtractorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.generation_timeout(), None);
    }

    #[test]
    fn test_invalid_max_input_length() {
        let config = ExtractorConfig {
            max_input_length: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ExtractorConfig {
            generation_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_settings_use_defaults() {
        let config: ExtractorConfig =
            serde_json::from_str(r#"{"generation_timeout_secs": 30}"#).unwrap();
        assert_eq!(config.max_input_length, 50_000);
        assert_eq!(config.generation_timeout(), Some(Duration::from_secs(30)));

        let unset = serde_json::to_value(ExtractorConfig::default()).unwrap();
        assert!(unset.get("generation_timeout_secs").is_none());
    }
}

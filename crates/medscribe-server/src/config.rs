//! Configuration file parsing for the server.
//!
//! Loads settings from TOML files: bind address, generation provider
//! settings and extraction limits.

use medscribe_extractor::ExtractorConfig;
use medscribe_llm::gemini::{DEFAULT_ENDPOINT, DEFAULT_MAX_ATTEMPTS, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field or secret
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// Field present but out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_address: String,

    /// Bind port (e.g., 8080)
    pub bind_port: u16,

    /// Generation provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Extraction limits
    #[serde(default)]
    pub extraction: ExtractorConfig,
}

/// Generation provider configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API base URL
    pub endpoint: String,

    /// Model name (e.g., "gemini-1.5-flash")
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,

    /// Attempts per generation call; 1 disables retry
    pub max_attempts: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ProviderConfig {
    /// Resolve the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField(format!("API key (set {})", self.api_key_env)))
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.model.is_empty() {
            return Err(ConfigError::MissingField("provider.model".to_string()));
        }
        if self.provider.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "provider.max_attempts must be at least 1".to_string(),
            ));
        }
        self.extraction.validate().map_err(ConfigError::Invalid)
    }

    /// Create a default configuration for testing
    pub fn default_test_config() -> Self {
        ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8080,
            provider: ProviderConfig::default(),
            extraction: ExtractorConfig::default(),
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default_test_config();
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.bind_port, 8080);
        assert_eq!(config.provider.model, DEFAULT_MODEL);
        assert_eq!(config.provider.max_attempts, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bind_addr() {
        let config = ServerConfig::default_test_config();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            bind_address = "0.0.0.0"
            bind_port = 9000

            [provider]
            model = "gemini-1.5-pro"
            api_key_env = "MEDSCRIBE_KEY"
            max_attempts = 3

            [extraction]
            max_input_length = 20000
            generation_timeout_secs = 45
        "#;

        let config: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.provider.model, "gemini-1.5-pro");
        assert_eq!(config.provider.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.provider.api_key_env, "MEDSCRIBE_KEY");
        assert_eq!(config.provider.max_attempts, 3);
        assert_eq!(config.extraction.max_input_length, 20_000);
        assert_eq!(config.extraction.generation_timeout_secs, Some(45));
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: ServerConfig =
            toml::from_str("bind_address = \"127.0.0.1\"\nbind_port = 3000").unwrap();
        assert_eq!(config.provider.api_key_env, "GOOGLE_API_KEY");
        assert_eq!(config.extraction, ExtractorConfig::default());
    }

    #[test]
    fn test_from_file_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "bind_address = \"127.0.0.1\"\nbind_port = 3000\n[extraction]\nmax_input_length = 0"
        )
        .unwrap();

        let result = ServerConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_file_missing() {
        let result = ServerConfig::from_file("/nonexistent/medscribe.toml");
        assert!(matches!(result, Err(ConfigError::FileRead(_))));
    }

    #[test]
    fn test_missing_api_key() {
        let provider = ProviderConfig {
            api_key_env: "MEDSCRIBE_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        assert!(matches!(provider.api_key(), Err(ConfigError::MissingField(_))));
    }
}

//! Medscribe Generation Provider Layer
//!
//! Implementations of the `GenerationProvider` trait from `medscribe-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `GeminiProvider`: Google Generative Language API integration
//!
//! # Examples
//!
//! ```
//! use medscribe_llm::MockProvider;
//! use medscribe_domain::GenerationProvider;
//!
//! let provider = MockProvider::new("Hello from the model!");
//! let result = provider.generate("test prompt").unwrap();
//! assert_eq!(result, "Hello from the model!");
//! ```

#![warn(missing_docs)]

pub mod gemini;

use medscribe_domain::GenerationProvider;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub use gemini::GeminiProvider;

/// Errors that can occur during generation
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the model API
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit or quota exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// The caller's deadline passed before the call could complete
    #[error("Generation deadline exceeded")]
    DeadlineExceeded,

    /// Provider misconfiguration (e.g. missing API key)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<String, Result<String, String>>,
    call_count: usize,
    last_prompt: Option<String>,
    last_image_ref: Option<String>,
}

/// Mock provider for deterministic testing
///
/// Returns pre-configured responses without making any network calls.
/// Clones share their state, so a clone handed to a pipeline can still be
/// inspected by the test that created it.
///
/// # Examples
///
/// ```
/// use medscribe_llm::MockProvider;
/// use medscribe_domain::GenerationProvider;
///
/// // Simple fixed response
/// let provider = MockProvider::new("Fixed response");
/// assert_eq!(provider.generate("any prompt").unwrap(), "Fixed response");
///
/// // Per-prompt responses
/// let provider = MockProvider::default();
/// provider.add_response("prompt1", "response1");
/// provider.add_error("prompt2", "quota exhausted");
/// assert_eq!(provider.generate("prompt1").unwrap(), "response1");
/// assert!(provider.generate("prompt2").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: Result<String, String>,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: Ok(response.into()),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Create a MockProvider that fails every call with the given message
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            default_response: Err(message.into()),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Add a specific response for a given prompt
    pub fn add_response(&self, prompt: impl Into<String>, response: impl Into<String>) {
        self.state()
            .responses
            .insert(prompt.into(), Ok(response.into()));
    }

    /// Configure to return an error for a specific prompt
    pub fn add_error(&self, prompt: impl Into<String>, message: impl Into<String>) {
        self.state()
            .responses
            .insert(prompt.into(), Err(message.into()));
    }

    /// Get the number of times a generate method was called
    pub fn call_count(&self) -> usize {
        self.state().call_count
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        self.state().call_count = 0;
    }

    /// The most recent prompt received
    pub fn last_prompt(&self) -> Option<String> {
        self.state().last_prompt.clone()
    }

    /// The image reference of the most recent image call
    pub fn last_image_ref(&self) -> Option<String> {
        self.state().last_image_ref.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not poison the mock for the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn respond(&self, prompt: &str, image_ref: Option<&str>) -> Result<String, LlmError> {
        let mut state = self.state();
        state.call_count += 1;
        state.last_prompt = Some(prompt.to_string());
        state.last_image_ref = image_ref.map(str::to_string);

        let response = state
            .responses
            .get(prompt)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone());

        response.map_err(LlmError::Other)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl GenerationProvider for MockProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        self.respond(prompt, None)
    }

    fn generate_with_image(&self, prompt: &str, image_ref: &str) -> Result<String, Self::Error> {
        self.respond(prompt, Some(image_ref))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = provider.generate("any prompt");
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "Test response");
    }

    #[test]
    fn test_mock_provider_specific_responses() {
        let provider = MockProvider::default();
        provider.add_response("hello", "world");
        provider.add_response("foo", "bar");

        assert_eq!(provider.generate("hello").unwrap(), "world");
        assert_eq!(provider.generate("foo").unwrap(), "bar");
        assert_eq!(provider.generate("unknown").unwrap(), "Default mock response");
    }

    #[test]
    fn test_mock_provider_call_count() {
        let provider = MockProvider::new("test");

        assert_eq!(provider.call_count(), 0);

        provider.generate("prompt1").unwrap();
        assert_eq!(provider.call_count(), 1);

        provider.generate_with_image("prompt2", "scan.png").unwrap();
        assert_eq!(provider.call_count(), 2);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_mock_provider_error() {
        let provider = MockProvider::default();
        provider.add_error("bad prompt", "quota exhausted");

        let result = provider.generate("bad prompt");
        assert!(matches!(result, Err(LlmError::Other(ref m)) if m == "quota exhausted"));
    }

    #[test]
    fn test_mock_provider_failing() {
        let provider = MockProvider::failing("unreachable");
        assert!(provider.generate("anything").is_err());
        assert!(provider.generate_with_image("anything", "x.png").is_err());
        assert_eq!(provider.call_count(), 2);
    }

    #[test]
    fn test_mock_provider_records_last_call() {
        let provider = MockProvider::new("ok");
        provider.generate_with_image("describe", "gs://bucket/xray.jpg").unwrap();
        assert_eq!(provider.last_prompt().as_deref(), Some("describe"));
        assert_eq!(provider.last_image_ref().as_deref(), Some("gs://bucket/xray.jpg"));

        provider.generate("plain").unwrap();
        assert_eq!(provider.last_image_ref(), None);
    }

    #[test]
    fn test_mock_provider_clone() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.generate("test").unwrap();

        // Both should share the same call count due to Arc
        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }
}

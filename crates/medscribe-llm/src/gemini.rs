//! Gemini Provider Implementation
//!
//! Provides integration with Google's Generative Language API
//! (`models/{model}:generateContent`).
//!
//! # Features
//!
//! - Blocking HTTP communication, meant to be driven from a worker thread
//! - Configurable endpoint, model and request timeout
//! - Image references sent as `fileData` parts
//! - Caller-bounded attempts; a single attempt unless configured otherwise
//! - Caller deadlines clamp request timeouts and stop further attempts
//!
//! # Examples
//!
//! ```no_run
//! use medscribe_llm::GeminiProvider;
//! use medscribe_domain::GenerationProvider;
//!
//! let provider = GeminiProvider::new(
//!     "https://generativelanguage.googleapis.com",
//!     "gemini-1.5-flash",
//!     "my-api-key",
//! )?;
//! let text = provider.generate("Say hello")?;
//! # Ok::<(), medscribe_llm::LlmError>(())
//! ```

use crate::LlmError;
use medscribe_domain::GenerationProvider;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default Generative Language API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default timeout for a single HTTP request (60 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default number of attempts per call (no retry)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

/// Gemini API provider
///
/// Constructed once per process and shared across requests.
pub struct GeminiProvider {
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::blocking::Client,
    request_timeout: Duration,
    max_attempts: u32,
}

/// Request body for the generateContent API
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    File {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

/// Response from the generateContent API
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateContentResponse {
    /// Concatenate the text parts of the first candidate
    fn into_text(self) -> Result<String, LlmError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("Response has no candidates".to_string()))?;

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text),
                Part::File { .. } => None,
            })
            .collect();

        Ok(text)
    }
}

impl GeminiProvider {
    /// Create a new Gemini provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: API base URL (e.g., "https://generativelanguage.googleapis.com")
    /// - `model`: Model to use (e.g., "gemini-1.5-flash")
    /// - `api_key`: API key sent with every request
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, LlmError> {
        Self::with_timeout(endpoint, model, api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a new Gemini provider with a custom per-request timeout
    pub fn with_timeout(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Config("API key is empty".to_string()));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            client,
            request_timeout: timeout,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Set the maximum number of attempts per call (minimum 1)
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }

    fn send(&self, parts: Vec<Part>, deadline: Option<Instant>) -> Result<String, LlmError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
        };
        let url = self.url();

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_attempts {
            let timeout = match deadline {
                Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                    Some(left) if !left.is_zero() => left.min(self.request_timeout),
                    _ => {
                        warn!("Generation deadline reached after {} attempts", attempts);
                        return Err(LlmError::DeadlineExceeded);
                    }
                },
                None => self.request_timeout,
            };

            match self.send_once(&url, &body, timeout) {
                Ok(text) => return Ok(text),
                Err(e @ (LlmError::Communication(_) | LlmError::RateLimitExceeded)) => {
                    warn!("Generation attempt {} failed: {}", attempts + 1, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            attempts += 1;
            if attempts < self.max_attempts {
                // Exponential backoff: 1s, 2s, 4s, etc.
                let backoff = Duration::from_secs(2u64.pow(attempts - 1));
                if deadline.is_some_and(|deadline| Instant::now() + backoff >= deadline) {
                    debug!("No time left before the deadline for another attempt");
                    break;
                }
                std::thread::sleep(backoff);
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Communication("Max attempts exceeded".to_string())))
    }

    fn send_once(
        &self,
        url: &str,
        body: &GenerateContentRequest,
        timeout: Duration,
    ) -> Result<String, LlmError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(timeout)
            .json(body)
            .send()
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let parsed: GenerateContentResponse = response
                .json()
                .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
            let text = parsed.into_text()?;
            debug!("Model {} returned {} chars", self.model, text.len());
            Ok(text)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(LlmError::ModelNotAvailable(self.model.clone()))
        } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(LlmError::RateLimitExceeded)
        } else {
            let error_text = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(LlmError::Communication(format!("HTTP {}: {}", status, error_text)))
        }
    }
}

/// Guess an image MIME type from a reference's file extension
fn infer_mime_type(image_ref: &str) -> &'static str {
    let path = image_ref.split(['?', '#']).next().unwrap_or(image_ref);
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "pdf" => "application/pdf",
        _ => "image/jpeg",
    }
}

impl GenerationProvider for GeminiProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        self.generate_until(prompt, None, None)
    }

    fn generate_with_image(&self, prompt: &str, image_ref: &str) -> Result<String, Self::Error> {
        self.generate_until(prompt, Some(image_ref), None)
    }

    fn generate_until(
        &self,
        prompt: &str,
        image_ref: Option<&str>,
        deadline: Option<Instant>,
    ) -> Result<String, Self::Error> {
        let mut parts = vec![Part::Text {
            text: prompt.to_string(),
        }];
        if let Some(image_ref) = image_ref {
            parts.push(Part::File {
                file_data: FileData {
                    mime_type: infer_mime_type(image_ref).to_string(),
                    file_uri: image_ref.to_string(),
                },
            });
        }
        self.send(parts, deadline)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

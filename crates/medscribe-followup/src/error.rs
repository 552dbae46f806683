//! Error types for follow-up answering

use thiserror::Error;

/// Errors that can occur while answering a follow-up question
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FollowUpError {
    /// Question missing or blank
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The generation provider was unreachable or returned an error
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
}

impl FollowUpError {
    /// Stable snake-case classification, for logs and response bodies
    pub fn kind(&self) -> &'static str {
        match self {
            FollowUpError::InvalidInput(_) => "invalid_input",
            FollowUpError::GenerationFailed(_) => "generation_failed",
        }
    }
}

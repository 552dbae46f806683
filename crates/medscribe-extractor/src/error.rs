//! Error types for the Extractor

use crate::parser::ParseFailure;
use crate::types::ExtractionStage;
use thiserror::Error;

/// Classified reasons an extraction can fail
///
/// Every variant is terminal for the invocation that produced it; the
/// pipeline never retries internally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// Required input missing (or unusable) in the caller's payload
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The generation provider was unreachable or returned an error
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// The model output could not be decoded into a structured value
    #[error("Extraction failed: {reason}")]
    ExtractionFailed {
        /// Why recovery parsing failed
        reason: ParseFailure,
        /// The offending model output
        raw_output: String,
    },

    /// The decoded value lacks required top-level fields
    #[error("Schema violation: missing fields [{}]", .missing_fields.join(", "))]
    SchemaViolation {
        /// Every missing required field, in schema order
        missing_fields: Vec<String>,
    },
}

impl ExtractionError {
    /// Stable snake-case classification, for logs and response bodies
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionError::InvalidInput(_) => "invalid_input",
            ExtractionError::GenerationFailed(_) => "generation_failed",
            ExtractionError::ExtractionFailed { .. } => "extraction_failed",
            ExtractionError::SchemaViolation { .. } => "schema_violation",
        }
    }

    /// Pipeline stage at which the failure occurred
    pub fn stage(&self) -> ExtractionStage {
        match self {
            ExtractionError::InvalidInput(_) => ExtractionStage::Received,
            ExtractionError::GenerationFailed(_) => ExtractionStage::Generating,
            ExtractionError::ExtractionFailed { .. } => ExtractionStage::Parsing,
            ExtractionError::SchemaViolation { .. } => ExtractionStage::Validating,
        }
    }

    /// Whether the caller supplied bad input (as opposed to an internal failure)
    pub fn is_client_error(&self) -> bool {
        matches!(self, ExtractionError::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_stage() {
        let err = ExtractionError::ExtractionFailed {
            reason: ParseFailure::NoJsonBlockFound,
            raw_output: "nope".to_string(),
        };
        assert_eq!(err.kind(), "extraction_failed");
        assert_eq!(err.stage(), ExtractionStage::Parsing);
        assert!(!err.is_client_error());

        let err = ExtractionError::InvalidInput("No text provided".to_string());
        assert_eq!(err.kind(), "invalid_input");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_schema_violation_lists_fields() {
        let err = ExtractionError::SchemaViolation {
            missing_fields: vec!["report_content".to_string(), "doctor_details".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Schema violation: missing fields [report_content, doctor_details]"
        );
        assert_eq!(err.stage(), ExtractionStage::Validating);
    }
}

//! Medscribe Extractor
//!
//! Turns free-form generative model output about a medical report into a
//! validated structured record, or into a classified failure.
//!
//! # Architecture
//!
//! ```text
//! Input → PromptBuilder → GenerationProvider → parse → validate → StructuredRecord
//! ```
//!
//! # Key Features
//!
//! - **Recovery parsing**: strict decoding first, then the widest `{ ... }`
//!   span when the model wrapped its JSON in prose
//! - **Presence validation**: every required top-level field must exist;
//!   nested shapes are advisory
//! - **Classified failures**: `InvalidInput`, `GenerationFailed`,
//!   `ExtractionFailed` and `SchemaViolation`, never retried internally
//!
//! # Example Usage
//!
//! ```no_run
//! use medscribe_domain::SchemaDescriptor;
//! use medscribe_extractor::{Extractor, ExtractorConfig, ExtractionInput};
//! use medscribe_llm::MockProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = MockProvider::new(
//!     r#"{"patient_details": {}, "report_content": {}, "doctor_details": {}}"#,
//! );
//! let extractor = Extractor::new(llm, ExtractorConfig::default());
//! let schema = SchemaDescriptor::report_from_text();
//!
//! let record = extractor
//!     .extract(ExtractionInput::from_text("Patient John, 45, male..."), &schema)
//!     .await?;
//! println!("Extracted {} fields", record.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod extractor;
mod parser;
mod prompt;
mod types;
mod validator;

#[cfg(test)]
mod tests;

pub use config::ExtractorConfig;
pub use error::ExtractionError;
pub use extractor::Extractor;
pub use parser::{parse, ParseFailure, ParseOutcome};
pub use prompt::PromptBuilder;
pub use types::{ExtractionInput, ExtractionStage};
pub use validator::{shape_advisories, validate, MissingFields, ShapeAdvisory, ValidationOutcome};

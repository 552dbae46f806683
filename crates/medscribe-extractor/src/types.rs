//! Request types and pipeline stages for extraction

use serde::{Deserialize, Serialize};

/// Caller-supplied input for one extraction
///
/// Which field is required depends on the task type of the schema the
/// extraction runs against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionInput {
    /// Free-form report text
    #[serde(default)]
    pub text: Option<String>,

    /// Reference (URI or storage path) to an image of the report
    #[serde(default, alias = "imageRef")]
    pub image_ref: Option<String>,
}

impl ExtractionInput {
    /// Input carrying report text
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image_ref: None,
        }
    }

    /// Input carrying an image reference
    pub fn from_image(image_ref: impl Into<String>) -> Self {
        Self {
            text: None,
            image_ref: Some(image_ref.into()),
        }
    }
}

/// Stages of a single extraction request
///
/// `Received → Generating → Parsing → Validating → Complete`; a failure at
/// any stage is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionStage {
    /// Input accepted, not yet checked
    Received,
    /// Waiting on the generation provider
    Generating,
    /// Recovery parsing of the model output
    Parsing,
    /// Checking required fields
    Validating,
    /// Record produced
    Complete,
}

impl ExtractionStage {
    /// Get the stage name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStage::Received => "received",
            ExtractionStage::Generating => "generating",
            ExtractionStage::Parsing => "parsing",
            ExtractionStage::Validating => "validating",
            ExtractionStage::Complete => "complete",
        }
    }
}

impl std::fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Recovery parsing of model output into a generic structured value
//!
//! Models frequently wrap otherwise valid JSON in prose or markdown fences.
//! Parsing is two-staged: the whole text is decoded strictly first, and
//! only if that fails is the widest `{ ... }` span (first `{` through last
//! `}`) decoded instead. Failures come back as data, never as panics.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Why recovery parsing could not produce a value
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailure {
    /// The text contains no `{ ... }` span at all
    #[error("No JSON block found in the model response")]
    NoJsonBlockFound,

    /// A `{ ... }` span exists but does not decode
    #[error("Failed to parse valid JSON from the model response")]
    MalformedJsonText,
}

impl ParseFailure {
    /// Stable snake-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseFailure::NoJsonBlockFound => "no_json_block_found",
            ParseFailure::MalformedJsonText => "malformed_json_text",
        }
    }
}

/// Outcome of recovery parsing
pub type ParseOutcome = Result<Value, ParseFailure>;

/// Parse raw model output into a structured value
pub fn parse(raw: &str) -> ParseOutcome {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => {
            debug!("Strict parse succeeded");
            return Ok(value);
        }
        Err(e) => debug!("Strict parse failed ({}), trying brace recovery", e),
    }

    let block = json_block(raw).ok_or_else(|| {
        warn!("No JSON block found in model response");
        ParseFailure::NoJsonBlockFound
    })?;

    serde_json::from_str::<Value>(block).map_err(|e| {
        warn!("Recovered JSON block is malformed: {}", e);
        ParseFailure::MalformedJsonText
    })
}

/// Widest brace-delimited span: first `{` through last `}` inclusive
fn json_block(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

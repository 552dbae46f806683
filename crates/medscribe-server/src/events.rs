//! Document-created event handling.
//!
//! When a report document is created the analysis is extracted and written
//! back to the document's analysis slot. Failures are terminal for the event:
//! they are logged and nothing is written, so a document is left without an
//! analysis rather than with a partial one. Delivery may repeat; writing
//! overwrites the same slot, so re-running an event is harmless.

use crate::handlers::AppState;
use medscribe_domain::{GenerationProvider, StructuredRecord, TaskType};
use medscribe_extractor::ExtractionInput;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Persistence error
#[derive(Debug, Error)]
pub enum SinkError {
    /// Backing store rejected the write
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Destination for extracted analyses
pub trait AnalysisSink: Send + Sync {
    /// Store `analysis` as the analysis of `document_id`, replacing any previous one
    fn save_analysis(&self, document_id: &str, analysis: &StructuredRecord) -> Result<(), SinkError>;
}

/// In-memory analysis store
#[derive(Debug, Default)]
pub struct MemoryAnalysisSink {
    analyses: RwLock<HashMap<String, StructuredRecord>>,
}

impl MemoryAnalysisSink {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Analysis stored for a document
    pub fn get(&self, document_id: &str) -> Option<StructuredRecord> {
        self.read().get(document_id).cloned()
    }

    /// Number of documents with an analysis
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no analysis has been stored
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, StructuredRecord>> {
        self.analyses.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, StructuredRecord>> {
        self.analyses.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AnalysisSink for MemoryAnalysisSink {
    fn save_analysis(&self, document_id: &str, analysis: &StructuredRecord) -> Result<(), SinkError> {
        self.write().insert(document_id.to_string(), analysis.clone());
        Ok(())
    }
}

/// A newly created report document
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentCreatedEvent {
    /// Collection the document was created in ("texts" or "images")
    pub collection: String,

    /// Document identifier
    pub document_id: String,

    /// Document contents
    #[serde(default)]
    pub data: Value,
}

/// What handling an event amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Analysis extracted and written
    Saved,
    /// Nothing to do (unknown collection or no input in the document)
    Skipped,
    /// Extraction or write failed; nothing written
    Failed,
}

fn task_for_collection(collection: &str) -> Option<TaskType> {
    match collection {
        "texts" => Some(TaskType::ReportFromText),
        "images" => Some(TaskType::ReportFromImage),
        _ => None,
    }
}

fn has_input(input: &ExtractionInput, task: TaskType) -> bool {
    let field = match task {
        TaskType::ReportFromText => &input.text,
        TaskType::ReportFromImage => &input.image_ref,
    };
    field.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Extract and store the analysis of a newly created document
pub async fn handle_document_created<L>(state: &AppState<L>, event: DocumentCreatedEvent) -> EventOutcome
where
    L: GenerationProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    let Some(task) = task_for_collection(&event.collection) else {
        warn!("Ignoring event for unknown collection '{}'", event.collection);
        return EventOutcome::Skipped;
    };

    let input: ExtractionInput = match serde_json::from_value(event.data) {
        Ok(input) => input,
        Err(e) => {
            warn!("Document {} has unreadable data: {}", event.document_id, e);
            return EventOutcome::Skipped;
        }
    };

    if !has_input(&input, task) {
        debug!("Document {} has no {} input, skipping", event.document_id, task);
        return EventOutcome::Skipped;
    }

    info!("Document created in '{}': {}", event.collection, event.document_id);

    let record = match state.extractor.extract(input, state.schema(task)).await {
        Ok(record) => record,
        Err(e) => {
            error!(
                kind = e.kind(),
                "Analysis of document {} failed: {}", event.document_id, e
            );
            return EventOutcome::Failed;
        }
    };

    match state.sink.save_analysis(&event.document_id, &record) {
        Ok(()) => {
            info!("Analysis saved for document {}", event.document_id);
            EventOutcome::Saved
        }
        Err(e) => {
            error!("Saving analysis for document {} failed: {}", event.document_id, e);
            EventOutcome::Failed
        }
    }
}

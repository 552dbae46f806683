//! HTTP request handlers for the extraction service.
//!
//! Implements report extraction, follow-up, event and health endpoints using axum.

use crate::events::{handle_document_created, AnalysisSink, DocumentCreatedEvent};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use medscribe_domain::{GenerationProvider, SchemaDescriptor, StructuredRecord, TaskType};
use medscribe_extractor::{ExtractionError, ExtractionInput, Extractor, ExtractorConfig};
use medscribe_followup::{FollowUpAnswer, FollowUpError, FollowUpResponder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
pub struct AppState<L>
where
    L: GenerationProvider,
{
    /// Extraction pipeline
    pub extractor: Arc<Extractor<L>>,
    /// Follow-up question answering
    pub responder: Arc<FollowUpResponder<L>>,
    /// Where event-triggered analyses are written
    pub sink: Arc<dyn AnalysisSink>,
    text_schema: Arc<SchemaDescriptor>,
    image_schema: Arc<SchemaDescriptor>,
}

impl<L> AppState<L>
where
    L: GenerationProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    /// Build the state around one shared provider
    ///
    /// The configured generation timeout bounds both extraction and
    /// follow-up answering.
    pub fn new(provider: Arc<L>, config: ExtractorConfig, sink: Arc<dyn AnalysisSink>) -> Self {
        let timeout = config.generation_timeout();
        Self {
            extractor: Arc::new(Extractor::from_shared(Arc::clone(&provider), config)),
            responder: Arc::new(FollowUpResponder::from_shared(provider).with_timeout(timeout)),
            sink,
            text_schema: Arc::new(SchemaDescriptor::report_from_text()),
            image_schema: Arc::new(SchemaDescriptor::report_from_image()),
        }
    }
}

impl<L: GenerationProvider> AppState<L> {
    /// Schema governing a task type
    pub fn schema(&self, task: TaskType) -> &SchemaDescriptor {
        match task {
            TaskType::ReportFromText => &self.text_schema,
            TaskType::ReportFromImage => &self.image_schema,
        }
    }
}

impl<L: GenerationProvider> Clone for AppState<L> {
    fn clone(&self) -> Self {
        Self {
            extractor: Arc::clone(&self.extractor),
            responder: Arc::clone(&self.responder),
            sink: Arc::clone(&self.sink),
            text_schema: Arc::clone(&self.text_schema),
            image_schema: Arc::clone(&self.image_schema),
        }
    }
}

/// Follow-up question request
#[derive(Debug, Deserialize)]
pub struct FollowUpRequest {
    /// Previously extracted record
    pub record: StructuredRecord,
    /// Question about the record
    #[serde(default)]
    pub question: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Model behind the generation provider
    pub model: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Request body missing, not JSON, or of the wrong shape
    InvalidBody(String),
    /// Extraction failed
    Extraction(ExtractionError),
    /// Follow-up answering failed
    FollowUp(FollowUpError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        let client_error = match self {
            AppError::InvalidBody(_) => true,
            AppError::Extraction(e) => e.is_client_error(),
            AppError::FollowUp(e) => matches!(e, FollowUpError::InvalidInput(_)),
        };
        if client_error {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn details(&self) -> Value {
        match self {
            AppError::Extraction(ExtractionError::ExtractionFailed { reason, raw_output }) => json!({
                "kind": "extraction_failed",
                "reason": reason.as_str(),
                "message": reason.to_string(),
                "raw_output": raw_output,
            }),
            AppError::Extraction(ExtractionError::SchemaViolation { missing_fields }) => json!({
                "kind": "schema_violation",
                "missing_fields": missing_fields,
            }),
            AppError::InvalidBody(msg) => json!({ "kind": "invalid_input", "message": msg }),
            AppError::Extraction(e) => json!({ "kind": e.kind(), "message": e.to_string() }),
            AppError::FollowUp(e) => json!({ "kind": e.kind(), "message": e.to_string() }),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::InvalidBody(msg)
            | AppError::Extraction(ExtractionError::InvalidInput(msg))
            | AppError::FollowUp(FollowUpError::InvalidInput(msg)) => msg.clone(),
            _ => "Internal Server Error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = if status == StatusCode::BAD_REQUEST {
            json!({ "error": self.message() })
        } else {
            json!({ "error": self.message(), "details": self.details() })
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = format!("Invalid request body: {}", rejection.body_text());
        warn!(kind = "invalid_input", status = %rejection.status(), "{}", message);
        AppError::InvalidBody(message)
    }
}

impl From<ExtractionError> for AppError {
    fn from(e: ExtractionError) -> Self {
        AppError::Extraction(e)
    }
}

impl From<FollowUpError> for AppError {
    fn from(e: FollowUpError) -> Self {
        AppError::FollowUp(e)
    }
}

/// POST /reports/text - Extract a record from report text
async fn analyze_text_report<L>(
    State(state): State<AppState<L>>,
    payload: Result<Json<ExtractionInput>, JsonRejection>,
) -> Result<Json<StructuredRecord>, AppError>
where
    L: GenerationProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    let Json(input) = payload?;
    info!("Received text report ({} chars)", input.text.as_deref().map_or(0, str::len));
    let record = state
        .extractor
        .extract(input, state.schema(TaskType::ReportFromText))
        .await?;
    Ok(Json(record))
}

/// POST /reports/image - Extract a record from an image reference
async fn analyze_image_report<L>(
    State(state): State<AppState<L>>,
    payload: Result<Json<ExtractionInput>, JsonRejection>,
) -> Result<Json<StructuredRecord>, AppError>
where
    L: GenerationProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    let Json(input) = payload?;
    info!("Received image report: {:?}", input.image_ref);
    let record = state
        .extractor
        .extract(input, state.schema(TaskType::ReportFromImage))
        .await?;
    Ok(Json(record))
}

/// POST /followup - Answer a question about a record
async fn follow_up<L>(
    State(state): State<AppState<L>>,
    payload: Result<Json<FollowUpRequest>, JsonRejection>,
) -> Result<Json<FollowUpAnswer>, AppError>
where
    L: GenerationProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    let Json(request) = payload?;
    let answer = state
        .responder
        .answer(&request.record, &request.question)
        .await?;
    Ok(Json(answer))
}

/// POST /events/document-created - Analyze a newly created document
///
/// Always accepted: event failures are logged, never reported back.
async fn document_created<L>(
    State(state): State<AppState<L>>,
    payload: Result<Json<DocumentCreatedEvent>, JsonRejection>,
) -> StatusCode
where
    L: GenerationProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    let event = match payload {
        Ok(Json(event)) => event,
        Err(rejection) => {
            warn!(
                kind = "invalid_input",
                status = %rejection.status(),
                "Dropping unreadable document event: {}",
                rejection.body_text()
            );
            return StatusCode::ACCEPTED;
        }
    };

    let outcome = handle_document_created(&state, event).await;
    info!("Document event handled: {:?}", outcome);
    StatusCode::ACCEPTED
}

/// GET /health - Liveness check
async fn health_check<L>(State(state): State<AppState<L>>) -> Json<HealthCheckResponse>
where
    L: GenerationProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        model: state.extractor.provider().model_name().to_string(),
    })
}

/// Create the axum router with all routes
pub fn create_router<L>(state: AppState<L>) -> AxumRouter
where
    L: GenerationProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    AxumRouter::new()
        .route("/reports/text", post(analyze_text_report::<L>))
        .route("/reports/image", post(analyze_image_report::<L>))
        .route("/followup", post(follow_up::<L>))
        .route("/events/document-created", post(document_created::<L>))
        .route("/health", get(health_check::<L>))
        .with_state(state)
}

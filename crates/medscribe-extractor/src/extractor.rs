//! Core extraction pipeline

use crate::config::ExtractorConfig;
use crate::error::ExtractionError;
use crate::parser::parse;
use crate::prompt::PromptBuilder;
use crate::types::{ExtractionInput, ExtractionStage};
use crate::validator::validate;
use medscribe_domain::{GenerationProvider, SchemaDescriptor, StructuredRecord, TaskType};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

/// Turns report input into a validated structured record
///
/// One `extract` call is one independent unit of work: the only shared
/// state is the provider, which is constructed once and reused.
pub struct Extractor<L>
where
    L: GenerationProvider,
{
    provider: Arc<L>,
    config: ExtractorConfig,
}

/// Input that passed the admission checks
enum Source {
    Text(String),
    Image(String),
}

impl<L> Extractor<L>
where
    L: GenerationProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    /// Create a new Extractor
    pub fn new(provider: L, config: ExtractorConfig) -> Self {
        Self::from_shared(Arc::new(provider), config)
    }

    /// Create an Extractor around a provider shared with other components
    pub fn from_shared(provider: Arc<L>, config: ExtractorConfig) -> Self {
        Self { provider, config }
    }

    /// The configuration in use
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// The underlying generation provider
    pub fn provider(&self) -> &Arc<L> {
        &self.provider
    }

    /// Extract a structured record from `input` according to `schema`
    ///
    /// Single attempt: the provider is called at most once and no failure
    /// is retried. Every failure is logged with its classification before
    /// it is returned.
    pub async fn extract(
        &self,
        input: ExtractionInput,
        schema: &SchemaDescriptor,
    ) -> Result<StructuredRecord, ExtractionError> {
        let request_id = Uuid::now_v7();
        let span = info_span!("extract", %request_id, task = %schema.task());

        async move {
            let start = Instant::now();
            match self.run(input, schema).await {
                Ok(record) => {
                    info!(
                        "Extraction complete: {} fields in {} ms",
                        record.len(),
                        start.elapsed().as_millis()
                    );
                    Ok(record)
                }
                Err(e) => {
                    error!(kind = e.kind(), stage = %e.stage(), "Extraction failed: {}", e);
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        input: ExtractionInput,
        schema: &SchemaDescriptor,
    ) -> Result<StructuredRecord, ExtractionError> {
        debug!(stage = %ExtractionStage::Received, "Checking input");
        let source = self.admit(input, schema.task())?;

        let prompt = match &source {
            Source::Text(text) => PromptBuilder::new(schema).with_text(text).build(),
            Source::Image(_) => PromptBuilder::new(schema).build(),
        };
        let image_ref = match source {
            Source::Image(image_ref) => Some(image_ref),
            Source::Text(_) => None,
        };

        debug!(stage = %ExtractionStage::Generating, "Prompt length: {} chars", prompt.len());
        let raw_output = self.generate(prompt, image_ref).await?;

        debug!(stage = %ExtractionStage::Parsing, "Model output length: {} chars", raw_output.len());
        let value = parse(&raw_output).map_err(|reason| ExtractionError::ExtractionFailed {
            reason,
            raw_output,
        })?;

        debug!(stage = %ExtractionStage::Validating, "Checking required fields");
        let record = validate(value, schema).map_err(|missing| ExtractionError::SchemaViolation {
            missing_fields: missing.0,
        })?;

        debug!(stage = %ExtractionStage::Complete, "Record validated");
        Ok(record)
    }

    /// Reject input that the task cannot run on
    fn admit(&self, input: ExtractionInput, task: TaskType) -> Result<Source, ExtractionError> {
        match task {
            TaskType::ReportFromText => {
                let text = input
                    .text
                    .filter(|t| !t.trim().is_empty())
                    .ok_or_else(|| ExtractionError::InvalidInput("No text provided".to_string()))?;

                let length = text.chars().count();
                if length > self.config.max_input_length {
                    return Err(ExtractionError::InvalidInput(format!(
                        "Text too long: {} chars (max: {})",
                        length, self.config.max_input_length
                    )));
                }
                Ok(Source::Text(text))
            }
            TaskType::ReportFromImage => input
                .image_ref
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .map(Source::Image)
                .ok_or_else(|| {
                    ExtractionError::InvalidInput("No image reference provided".to_string())
                }),
        }
    }

    /// Call the provider on a worker thread, bounded by the optional timeout
    ///
    /// The provider receives the same deadline, so it stops its own work
    /// instead of running on after the caller has been answered.
    async fn generate(
        &self,
        prompt: String,
        image_ref: Option<String>,
    ) -> Result<String, ExtractionError> {
        let provider = Arc::clone(&self.provider);
        let deadline = self.config.generation_timeout().map(|limit| Instant::now() + limit);

        // The provider trait is blocking
        let call = tokio::task::spawn_blocking(move || {
            provider
                .generate_until(&prompt, image_ref.as_deref(), deadline)
                .map_err(|e| ExtractionError::GenerationFailed(e.to_string()))
        });

        let joined = match self.config.generation_timeout() {
            Some(limit) => timeout(limit, call).await.map_err(|_| {
                ExtractionError::GenerationFailed(format!(
                    "Generation timed out after {} s",
                    limit.as_secs()
                ))
            })?,
            None => call.await,
        };

        joined.map_err(|e| ExtractionError::GenerationFailed(format!("Task join error: {}", e)))?
    }
}

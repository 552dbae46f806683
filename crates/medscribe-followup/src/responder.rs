//! Grounded answering of follow-up questions

use crate::error::FollowUpError;
use crate::router::{route, FollowUpContext};
use medscribe_domain::{GenerationProvider, StructuredRecord};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{error, info};

/// Answer to a follow-up question, with the context it was grounded on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowUpAnswer {
    /// Record fragment handed to the model
    pub context: FollowUpContext,
    /// Generated answer text
    pub answer: String,
}

/// Answers questions about a previously extracted record
///
/// Generation is unbounded unless the caller sets a timeout, the same
/// policy the extraction pipeline follows.
pub struct FollowUpResponder<L>
where
    L: GenerationProvider,
{
    provider: Arc<L>,
    timeout: Option<Duration>,
}

impl<L> FollowUpResponder<L>
where
    L: GenerationProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    /// Create a responder owning its provider
    pub fn new(provider: L) -> Self {
        Self::from_shared(Arc::new(provider))
    }

    /// Create a responder around a provider shared with other components
    pub fn from_shared(provider: Arc<L>) -> Self {
        Self {
            provider,
            timeout: None,
        }
    }

    /// Bound each generation call (`None` leaves it unbounded)
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The underlying generation provider
    pub fn provider(&self) -> &Arc<L> {
        &self.provider
    }

    /// Bound applied to each generation call, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Route `question` to a fragment of `record` and generate an answer
    pub async fn answer(
        &self,
        record: &StructuredRecord,
        question: &str,
    ) -> Result<FollowUpAnswer, FollowUpError> {
        let question = question.trim();
        if question.is_empty() {
            let e = FollowUpError::InvalidInput("No question provided".to_string());
            error!(kind = e.kind(), "Follow-up rejected: {}", e);
            return Err(e);
        }

        let context = route(record, question);
        let prompt = grounded_prompt(&context, question);

        match self.generate(prompt).await {
            Ok(answer) => {
                info!("Follow-up answered ({} chars)", answer.len());
                Ok(FollowUpAnswer { context, answer })
            }
            Err(e) => {
                error!(kind = e.kind(), "Follow-up failed: {}", e);
                Err(e)
            }
        }
    }

    async fn generate(&self, prompt: String) -> Result<String, FollowUpError> {
        let provider = Arc::clone(&self.provider);
        let deadline = self.timeout.map(|limit| Instant::now() + limit);

        // The provider trait is blocking
        let call = tokio::task::spawn_blocking(move || {
            provider
                .generate_until(&prompt, None, deadline)
                .map_err(|e| FollowUpError::GenerationFailed(e.to_string()))
        });

        let joined = match self.timeout {
            Some(limit) => timeout(limit, call).await.map_err(|_| {
                FollowUpError::GenerationFailed(format!(
                    "Generation timed out after {} s",
                    limit.as_secs()
                ))
            })?,
            None => call.await,
        };

        joined.map_err(|e| FollowUpError::GenerationFailed(format!("Task join error: {}", e)))?
    }
}

/// Prompt asking the model to answer from the selected context only
pub fn grounded_prompt(context: &FollowUpContext, question: &str) -> String {
    format!(
        "You are answering a question about a patient's medical report.\n\
         Relevant information from the report:\n---\n{}\n---\n\n\
         Question: {}\n\n\
         Answer using only the information above. If it does not contain the answer, say so plainly.",
        context, question
    )
}

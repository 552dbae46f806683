//! Keyword routing of follow-up questions to a record fragment

use medscribe_domain::StructuredRecord;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Topic a follow-up question is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// The report's diagnosis
    Diagnosis,
    /// Prescribed medications
    Medications,
    /// The model-written summary (also the fallback)
    Summary,
}

/// Topics in priority order, each with its keywords; first match wins
const ROUTES: &[(Topic, &[&str])] = &[
    (Topic::Diagnosis, &["diagnosis"]),
    (Topic::Medications, &["medications"]),
    (Topic::Summary, &["summary"]),
];

impl Topic {
    /// Classify a question by case-insensitive keyword containment
    ///
    /// Questions matching no keyword fall back to [`Topic::Summary`].
    pub fn classify(question: &str) -> Self {
        let question = question.to_lowercase();
        ROUTES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| question.contains(k)))
            .map(|(topic, _)| *topic)
            .unwrap_or(Topic::Summary)
    }

    /// JSON pointer of the record field that grounds this topic
    pub fn pointer(&self) -> &'static str {
        match self {
            Topic::Diagnosis => "/report_content/diagnosis",
            Topic::Medications => "/report_content/treatment_plan/medications",
            Topic::Summary => "/model_insights/summary",
        }
    }

    /// Get the topic name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Diagnosis => "diagnosis",
            Topic::Medications => "medications",
            Topic::Summary => "summary",
        }
    }
}

/// Grounding text selected from a record for one follow-up question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FollowUpContext(String);

impl FollowUpContext {
    /// Borrow the grounding text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FollowUpContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Select the record fragment most relevant to `question`
///
/// An absent or `null` source field yields the literal text `null`; sparse
/// grounding is left for the generation step to handle.
pub fn route(record: &StructuredRecord, question: &str) -> FollowUpContext {
    let topic = Topic::classify(question);
    let context = render(record.pointer(topic.pointer()));
    debug!("Routed question to {} ({} chars)", topic.as_str(), context.len());
    FollowUpContext(context)
}

fn render(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}

//! Prompt composition for report extraction

use medscribe_domain::{SchemaDescriptor, TaskType};

/// Builds the extraction prompt for a task
///
/// Composition is pure: the same task, input and schema always give the
/// same prompt text.
pub struct PromptBuilder<'a> {
    schema: &'a SchemaDescriptor,
    text: Option<&'a str>,
}

impl<'a> PromptBuilder<'a> {
    /// Create a prompt builder for the schema's task
    pub fn new(schema: &'a SchemaDescriptor) -> Self {
        Self { schema, text: None }
    }

    /// Report text to analyze (text task)
    pub fn with_text(mut self, text: &'a str) -> Self {
        self.text = Some(text);
        self
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        // 1. What to analyze
        match (self.schema.task(), self.text) {
            (TaskType::ReportFromText, Some(text)) => {
                prompt.push_str("Analyze this medical report text:\n---\n");
                prompt.push_str(text);
                prompt.push_str("\n---\n\n");
            }
            _ => prompt.push_str("Analyze the attached image of a medical report.\n\n"),
        }

        // 2. Fields to extract
        prompt.push_str(&format!("Extract {} in JSON format.\n", self.field_list()));
        if self.schema.task() == TaskType::ReportFromImage {
            prompt.push_str(
                "Under model_insights, summarize the report in plain language and list any recommendations.\n",
            );
        }
        prompt.push('\n');

        // 3. Expected structure
        prompt.push_str("Use this structure (null for anything the report does not state):\n");
        let skeleton = serde_json::to_string_pretty(&self.schema.skeleton())
            .unwrap_or_else(|_| "{}".to_string());
        prompt.push_str(&skeleton);
        prompt.push_str("\n\n");

        // 4. Output format reminder
        prompt.push_str(OUTPUT_FORMAT_REMINDER);

        prompt
    }

    /// Human-readable list of the fields to extract
    fn field_list(&self) -> String {
        let names: Vec<String> = self
            .schema
            .fields()
            .iter()
            .filter(|f| f.required || self.schema.task() == TaskType::ReportFromImage)
            .map(|f| f.name.replace('_', " "))
            .collect();

        match names.as_slice() {
            [] => "the report".to_string(),
            [only] => only.clone(),
            [init @ .., last] => format!("{}, and {}", init.join(", "), last),
        }
    }
}

const OUTPUT_FORMAT_REMINDER: &str =
    "Respond only with valid JSON without any additional commentary or explanation.";

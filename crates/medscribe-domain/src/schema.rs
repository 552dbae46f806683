//! Schema descriptors - the expected shape of a structured record per task

use serde_json::{Map, Value};

/// Kind of medical report extraction being performed
///
/// Each task type has its own schema descriptor and prompt:
/// - ReportFromText: the caller supplies the report as free text
/// - ReportFromImage: the caller supplies a reference to a scanned report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// Extraction from free-form report text
    ReportFromText,

    /// Extraction from an image of a report
    ReportFromImage,
}

impl TaskType {
    /// Get the task name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::ReportFromText => "report_from_text",
            TaskType::ReportFromImage => "report_from_image",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advisory shape of a field's value
///
/// Shapes are never enforced strictly: model output is tolerant by nature,
/// so a mismatch is reported but does not invalidate a record. `null` is
/// accepted for every shape.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape {
    /// Any value
    Any,

    /// Free text
    Text,

    /// A number
    Number,

    /// An ordered sequence of primitives
    List,

    /// A nested mapping with its own fields
    Object(Vec<FieldSpec>),
}

impl FieldShape {
    /// Whether `value` has this shape (`null` always does)
    pub fn matches(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            FieldShape::Any => true,
            FieldShape::Text => value.is_string(),
            FieldShape::Number => value.is_number(),
            FieldShape::List => value.is_array(),
            FieldShape::Object(_) => value.is_object(),
        }
    }

    /// Short description used in logs and prompt skeletons
    pub fn describe(&self) -> &'static str {
        match self {
            FieldShape::Any => "any",
            FieldShape::Text => "text",
            FieldShape::Number => "number",
            FieldShape::List => "list",
            FieldShape::Object(_) => "object",
        }
    }

    fn skeleton(&self) -> Value {
        match self {
            FieldShape::Any => Value::String("...".to_string()),
            FieldShape::Text => Value::String("text".to_string()),
            FieldShape::Number => Value::String("number".to_string()),
            FieldShape::List => Value::Array(vec![Value::String("text".to_string())]),
            FieldShape::Object(fields) => Value::Object(skeleton_of(fields)),
        }
    }
}

/// A named field with an advisory shape
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Key under which the field appears in a record
    pub name: String,

    /// Whether the key must be present (its value may still be `null`)
    pub required: bool,

    /// Advisory shape of the value
    pub shape: FieldShape,
}

impl FieldSpec {
    /// A required field
    pub fn required(name: impl Into<String>, shape: FieldShape) -> Self {
        Self {
            name: name.into(),
            required: true,
            shape,
        }
    }

    /// An optional field
    pub fn optional(name: impl Into<String>, shape: FieldShape) -> Self {
        Self {
            name: name.into(),
            required: false,
            shape,
        }
    }
}

/// Declares which top-level fields a structured record must contain
///
/// Defined once per task type and shared read-only across requests.
///
/// # Examples
///
/// ```
/// use medscribe_domain::{SchemaDescriptor, TaskType};
///
/// let schema = SchemaDescriptor::report_from_text();
/// assert_eq!(schema.task(), TaskType::ReportFromText);
/// let required: Vec<_> = schema.required_fields().collect();
/// assert_eq!(required, vec!["patient_details", "report_content", "doctor_details"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    task: TaskType,
    fields: Vec<FieldSpec>,
}

impl SchemaDescriptor {
    /// Create a descriptor from an ordered list of top-level fields
    pub fn new(task: TaskType, fields: Vec<FieldSpec>) -> Self {
        Self { task, fields }
    }

    /// Schema for reports extracted from free text
    ///
    /// `model_insights` is accepted but not required.
    pub fn report_from_text() -> Self {
        Self::new(
            TaskType::ReportFromText,
            vec![
                FieldSpec::required("patient_details", patient_details_shape()),
                FieldSpec::required("report_content", report_content_shape()),
                FieldSpec::required("doctor_details", doctor_details_shape()),
                FieldSpec::optional("model_insights", model_insights_shape()),
            ],
        )
    }

    /// Schema for reports extracted from an image
    ///
    /// Image analysis always asks for insights, so `model_insights` is required.
    pub fn report_from_image() -> Self {
        Self::new(
            TaskType::ReportFromImage,
            vec![
                FieldSpec::required("patient_details", patient_details_shape()),
                FieldSpec::required("report_content", report_content_shape()),
                FieldSpec::required("doctor_details", doctor_details_shape()),
                FieldSpec::required("model_insights", model_insights_shape()),
            ],
        )
    }

    /// Task type this schema governs
    pub fn task(&self) -> TaskType {
        self.task
    }

    /// All top-level fields, in declaration order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Names of the required top-level fields, in declaration order
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
    }

    /// Look up a top-level field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// JSON skeleton of the schema, with each leaf replaced by its shape name
    pub fn skeleton(&self) -> Value {
        Value::Object(skeleton_of(&self.fields))
    }
}

fn skeleton_of(fields: &[FieldSpec]) -> Map<String, Value> {
    fields
        .iter()
        .map(|f| (f.name.clone(), f.shape.skeleton()))
        .collect()
}

fn patient_details_shape() -> FieldShape {
    FieldShape::Object(vec![
        FieldSpec::optional("name", FieldShape::Text),
        FieldSpec::optional("age", FieldShape::Number),
        FieldSpec::optional("gender", FieldShape::Text),
    ])
}

fn report_content_shape() -> FieldShape {
    FieldShape::Object(vec![
        FieldSpec::optional("diagnosis", FieldShape::Text),
        FieldSpec::optional("findings", FieldShape::Any),
        FieldSpec::optional(
            "treatment_plan",
            FieldShape::Object(vec![
                FieldSpec::optional("medications", FieldShape::List),
                FieldSpec::optional("follow_up", FieldShape::Text),
            ]),
        ),
    ])
}

fn doctor_details_shape() -> FieldShape {
    FieldShape::Object(vec![
        FieldSpec::optional("name", FieldShape::Text),
        FieldSpec::optional("specialization", FieldShape::Text),
        FieldSpec::optional("hospital", FieldShape::Text),
    ])
}

fn model_insights_shape() -> FieldShape {
    FieldShape::Object(vec![
        FieldSpec::optional("summary", FieldShape::Text),
        FieldSpec::optional("recommendations", FieldShape::List),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_type_display() {
        assert_eq!(TaskType::ReportFromText.to_string(), "report_from_text");
        assert_eq!(TaskType::ReportFromImage.to_string(), "report_from_image");
    }

    #[test]
    fn test_text_schema_model_insights_optional() {
        let schema = SchemaDescriptor::report_from_text();
        assert!(!schema.field("model_insights").unwrap().required);
        assert_eq!(schema.required_fields().count(), 3);
    }

    #[test]
    fn test_image_schema_requires_insights() {
        let schema = SchemaDescriptor::report_from_image();
        assert_eq!(schema.task(), TaskType::ReportFromImage);
        let required: Vec<_> = schema.required_fields().collect();
        assert_eq!(
            required,
            vec!["patient_details", "report_content", "doctor_details", "model_insights"]
        );
    }

    #[test]
    fn test_shape_matching_accepts_null() {
        assert!(FieldShape::Text.matches(&json!("flu")));
        assert!(FieldShape::Text.matches(&Value::Null));
        assert!(!FieldShape::Text.matches(&json!(3)));
        assert!(FieldShape::List.matches(&json!(["a"])));
        assert!(!FieldShape::Object(vec![]).matches(&json!("x")));
        assert!(FieldShape::Any.matches(&json!({"k": 1})));
    }

    #[test]
    fn test_skeleton_nests_objects() {
        let skeleton = SchemaDescriptor::report_from_text().skeleton();
        assert_eq!(skeleton["patient_details"]["age"], json!("number"));
        assert_eq!(
            skeleton["report_content"]["treatment_plan"]["medications"],
            json!(["text"])
        );
        assert!(skeleton.get("model_insights").is_some());
    }
}

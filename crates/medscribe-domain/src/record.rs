//! Structured record - the validated output of an extraction

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A mapping from field name to value produced by a successful extraction
///
/// Records are immutable value objects. Presence of the required fields is
/// established by the validator in `medscribe-extractor`; a record received
/// back from a caller (e.g. for a follow-up question) is taken as-is.
///
/// # Examples
///
/// ```
/// use medscribe_domain::StructuredRecord;
/// use serde_json::json;
///
/// let record: StructuredRecord = serde_json::from_value(json!({
///     "report_content": { "diagnosis": "flu" }
/// })).unwrap();
/// assert_eq!(record.pointer("/report_content/diagnosis"), Some(&json!("flu")));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredRecord {
    fields: Map<String, Value>,
}

impl StructuredRecord {
    /// Wrap an already-validated mapping
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Get a top-level field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Whether a top-level key exists (its value may be `null`)
    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Look up a nested value by JSON pointer (e.g. `/report_content/diagnosis`)
    pub fn pointer(&self, path: &str) -> Option<&Value> {
        let path = path.strip_prefix('/')?;
        let (head, rest) = match path.split_once('/') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        // RFC 6901: "~1" is "/", "~0" is "~", in that order
        let head = head.replace("~1", "/").replace("~0", "~");
        let value = self.fields.get(&head)?;
        match rest {
            Some(rest) => value.pointer(&format!("/{rest}")),
            None => Some(value),
        }
    }

    /// Top-level field names, in key order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of top-level fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Borrow the underlying mapping
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Convert into a generic JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<Map<String, Value>> for StructuredRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> StructuredRecord {
        serde_json::from_value(json!({
            "patient_details": { "name": "John", "age": 45 },
            "report_content": { "treatment_plan": { "medications": ["A", "B"] } },
            "doctor_details": null
        }))
        .unwrap()
    }

    #[test]
    fn test_null_field_is_present() {
        let record = sample();
        assert!(record.contains_field("doctor_details"));
        assert_eq!(record.get("doctor_details"), Some(&Value::Null));
        assert!(!record.contains_field("model_insights"));
    }

    #[test]
    fn test_pointer_lookup() {
        let record = sample();
        assert_eq!(record.pointer("/patient_details/age"), Some(&json!(45)));
        assert_eq!(
            record.pointer("/report_content/treatment_plan/medications"),
            Some(&json!(["A", "B"]))
        );
        assert_eq!(record.pointer("/patient_details"), record.get("patient_details"));
        assert_eq!(record.pointer("/model_insights/summary"), None);
        assert_eq!(record.pointer("patient_details"), None);
    }

    #[test]
    fn test_pointer_unescapes_every_segment() {
        let record: StructuredRecord = serde_json::from_value(json!({
            "a/b": { "c~d": 1 },
            "~1": 2
        }))
        .unwrap();
        assert_eq!(record.pointer("/a~1b/c~0d"), Some(&json!(1)));
        assert_eq!(record.pointer("/a~1b"), Some(&json!({ "c~d": 1 })));
        assert_eq!(record.pointer("/~01"), Some(&json!(2)));
        assert_eq!(record.pointer("/a/b"), None);
    }

    #[test]
    fn test_rejects_non_object_documents() {
        assert!(serde_json::from_value::<StructuredRecord>(json!([1, 2])).is_err());
        assert!(serde_json::from_value::<StructuredRecord>(json!("text")).is_err());
    }

    #[test]
    fn test_serializes_transparently() {
        let record = sample();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, record.clone().into_value());
        assert_eq!(record.len(), 3);
        assert_eq!(
            record.field_names().collect::<Vec<_>>(),
            vec!["doctor_details", "patient_details", "report_content"]
        );
    }
}

//! Record validation against a schema descriptor
//!
//! Only presence of the required top-level keys is enforced. Nested shapes
//! are advisory: mismatches are logged and reported by
//! [`shape_advisories`], never turned into a failure.

use medscribe_domain::{FieldShape, FieldSpec, SchemaDescriptor, StructuredRecord};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Required top-level fields absent from a value, in schema order
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("missing required fields: {}", .0.join(", "))]
pub struct MissingFields(pub Vec<String>);

/// Outcome of validating a parsed value
pub type ValidationOutcome = Result<StructuredRecord, MissingFields>;

/// A present field whose value does not have the advisory shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeAdvisory {
    /// Dotted path of the field (e.g. `report_content.treatment_plan`)
    pub path: String,
    /// Shape the schema describes
    pub expected: &'static str,
}

/// Check that every required field of `schema` is a key of `value`
///
/// A value that is not a mapping is missing every required field. On
/// success the mapping is returned unchanged as a [`StructuredRecord`].
pub fn validate(value: Value, schema: &SchemaDescriptor) -> ValidationOutcome {
    let fields = match value {
        Value::Object(fields) => fields,
        other => {
            warn!("Model output is a {} rather than an object", type_name(&other));
            Map::new()
        }
    };

    let missing: Vec<String> = schema
        .required_fields()
        .filter(|name| !fields.contains_key(*name))
        .map(str::to_string)
        .collect();

    if !missing.is_empty() {
        return Err(MissingFields(missing));
    }

    for advisory in advisories_for(&fields, schema.fields(), "") {
        warn!(
            "Field '{}' does not look like {} (accepted anyway)",
            advisory.path, advisory.expected
        );
    }

    debug!("Record has all {} required fields", schema.required_fields().count());
    Ok(StructuredRecord::new(fields))
}

/// Report present fields whose values deviate from the advisory shapes
pub fn shape_advisories(record: &StructuredRecord, schema: &SchemaDescriptor) -> Vec<ShapeAdvisory> {
    advisories_for(record.as_map(), schema.fields(), "")
}

fn advisories_for(fields: &Map<String, Value>, specs: &[FieldSpec], prefix: &str) -> Vec<ShapeAdvisory> {
    let mut advisories = Vec::new();

    for spec in specs {
        let Some(value) = fields.get(&spec.name) else {
            continue;
        };
        let path = if prefix.is_empty() {
            spec.name.clone()
        } else {
            format!("{}.{}", prefix, spec.name)
        };

        if !spec.shape.matches(value) {
            advisories.push(ShapeAdvisory {
                path,
                expected: spec.shape.describe(),
            });
            continue;
        }

        if let (FieldShape::Object(nested), Value::Object(inner)) = (&spec.shape, value) {
            advisories.extend(advisories_for(inner, nested, &path));
        }
    }

    advisories
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

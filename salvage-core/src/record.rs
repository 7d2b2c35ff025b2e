//! Validated records, error records, and normalization warnings.

use crate::candidate::Provenance;
use crate::schema_id::SchemaId;
use crate::trail::PipelineStage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// How much the caller should trust a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Produced by the normal extract/repair/validate path.
    Normal,
    /// Assembled heuristically from free text; fields may be approximate.
    Low,
}

/// A non-blocking note emitted while normalizing a record.
///
/// Warnings cover defaulted fields, coerced values, dropped keys, and soft
/// quality findings. They never cause validation to fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// The field the warning concerns, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl Warning {
    /// Warning about a specific field.
    #[must_use]
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Warning about the record as a whole.
    #[must_use]
    pub fn record(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}", field, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// The terminal typed output of a pipeline run: a schema-valid record.
///
/// Immutable once constructed. Structural validity is guaranteed; factual
/// quality is not (soft findings are attached as notes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedRecord {
    schema: SchemaId,
    fields: Map<String, Value>,
    provenance: Provenance,
    confidence: Confidence,
    notes: Vec<Warning>,
}

impl ValidatedRecord {
    /// Create a record. Called by the validator; callers receive it read-only.
    #[must_use]
    pub fn new(
        schema: SchemaId,
        fields: Map<String, Value>,
        provenance: Provenance,
        confidence: Confidence,
        notes: Vec<Warning>,
    ) -> Self {
        Self {
            schema,
            fields,
            provenance,
            confidence,
            notes,
        }
    }

    /// The schema this record satisfies.
    pub fn schema(&self) -> SchemaId {
        self.schema
    }

    /// All fields, keyed by canonical name.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Look up one field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// A field as a string slice, when it is a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Which strategy ultimately produced the record.
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Confidence marker.
    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    /// Normalization notes: defaulted, coerced, and dropped fields plus soft
    /// quality findings.
    pub fn notes(&self) -> &[Warning] {
        &self.notes
    }
}

/// A terminal failure marker, distinct from [`ValidatedRecord`] by type.
///
/// Downstream code must branch on this and must never persist its contents as
/// if they were valid data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// The schema that was being targeted.
    pub schema: SchemaId,
    /// The stage at which the run terminated.
    pub stage: PipelineStage,
    /// The errors that ended the run, most recent last.
    pub errors: Vec<String>,
    /// A bounded snapshot of the last raw completion, for diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ErrorRecord {
    /// Create an error record.
    #[must_use]
    pub fn new(schema: SchemaId, stage: PipelineStage, errors: Vec<String>) -> Self {
        Self {
            schema,
            stage,
            errors,
            raw: None,
        }
    }

    /// Attach a raw completion snapshot.
    #[must_use]
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed at {}: {}",
            self.schema,
            self.stage,
            self.errors.join("; ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ValidatedRecord {
        let mut fields = Map::new();
        fields.insert("title".into(), json!("A"));
        fields.insert("score".into(), json!(7));
        ValidatedRecord::new(
            SchemaId::IdeaPitch,
            fields,
            Provenance::CodeFence,
            Confidence::Normal,
            vec![Warning::field("value", "defaulted")],
        )
    }

    #[test]
    fn test_accessors() {
        let record = sample();
        assert_eq!(record.get_str("title"), Some("A"));
        assert_eq!(record.get("score"), Some(&json!(7)));
        assert_eq!(record.notes().len(), 1);
        assert_eq!(record.confidence(), Confidence::Normal);
    }

    #[test]
    fn test_error_record_display() {
        let err = ErrorRecord::new(
            SchemaId::DeepDive,
            PipelineStage::SelfHeal,
            vec!["missing fields: summary".into()],
        );
        let text = err.to_string();
        assert!(text.contains("deep_dive"));
        assert!(text.contains("self_heal"));
    }
}

//! Schema validation and normalization.
//!
//! Normalization is where a parsed-but-messy payload becomes a
//! [`ValidatedRecord`] or a [`ValidationError`]. The order of operations is
//! fixed: shape, aliases, schema finalizer, per-field coercion, required-field
//! enforcement, defaults, unknown-key filtering, then soft heuristics.
//! Required fields are enforced before defaulting, so a missing required
//! field always fails rather than being papered over.

use crate::error::ValidationError;
use crate::heuristics::{default_heuristics, DuplicateTitleCheck, QualityHeuristic};
use crate::schema::{FieldKind, SchemaDef};
use salvage_core::{Confidence, Provenance, ValidatedRecord, Warning};
use serde_json::{Map, Number, Value};
use tracing::warn;

/// Validates payloads against a schema and normalizes them into records.
pub struct Normalizer {
    heuristics: Vec<Box<dyn QualityHeuristic>>,
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.heuristics.iter().map(|h| h.name()).collect();
        f.debug_struct("Normalizer")
            .field("heuristics", &names)
            .finish()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// A normalizer with the default soft heuristics.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heuristics: default_heuristics(),
        }
    }

    /// A normalizer with no heuristics at all.
    #[must_use]
    pub fn bare() -> Self {
        Self {
            heuristics: Vec::new(),
        }
    }

    /// Add a heuristic.
    #[must_use]
    pub fn with_heuristic(mut self, heuristic: Box<dyn QualityHeuristic>) -> Self {
        self.heuristics.push(heuristic);
        self
    }

    /// Add duplicate-title detection against a corpus of known titles.
    #[must_use]
    pub fn with_known_titles<I, S>(self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.with_heuristic(Box::new(DuplicateTitleCheck::with_titles(titles)))
    }

    /// Validate and normalize `value` against `schema`.
    ///
    /// Returns the record together with all warnings gathered on the way (the
    /// same list the record carries as notes).
    pub fn normalize(
        &self,
        value: &Value,
        schema: &SchemaDef,
        provenance: Provenance,
        confidence: Confidence,
    ) -> Result<(ValidatedRecord, Vec<Warning>), ValidationError> {
        let mut warnings = Vec::new();
        let mut raw = self.as_object(value, &mut warnings)?;

        self.apply_aliases(&mut raw, schema, &mut warnings);
        if let Some(finalize) = schema.finalize {
            finalize(&mut raw, &mut warnings);
        }

        let mut fields = Map::new();
        let mut missing = Vec::new();
        for spec in schema.fields {
            match raw.remove(spec.name) {
                Some(value) if !is_absent(&value) => {
                    let coerced = coerce(value, spec.kind, spec.name, &mut warnings);
                    if spec.is_required() && is_absent(&coerced) {
                        missing.push(spec.name.to_string());
                    } else {
                        fields.insert(spec.name.to_string(), coerced);
                    }
                }
                _ => {
                    if spec.is_required() {
                        missing.push(spec.name.to_string());
                    }
                }
            }
        }
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        // Defaults only after required enforcement has passed.
        for spec in schema.fields {
            if !fields.contains_key(spec.name) {
                if let Some(default) = spec.default_value() {
                    warnings.push(Warning::field(spec.name, "missing, default applied"));
                    fields.insert(spec.name.to_string(), default);
                }
            }
        }

        for (key, _) in raw {
            warn!(schema = %schema.id, key = %key, "dropping unknown field");
            warnings.push(Warning::field(key, "unknown field dropped"));
        }

        for heuristic in &self.heuristics {
            if let Some(finding) = heuristic.inspect(&fields) {
                warnings.push(finding);
            }
        }

        let record =
            ValidatedRecord::new(schema.id, fields, provenance, confidence, warnings.clone());
        Ok((record, warnings))
    }

    /// The payload as an object. An array's first object element is accepted
    /// with a warning; everything else is a shape failure.
    fn as_object(
        &self,
        value: &Value,
        warnings: &mut Vec<Warning>,
    ) -> Result<Map<String, Value>, ValidationError> {
        match value {
            Value::Object(map) => Ok(map.clone()),
            Value::Array(items) => {
                let first = items
                    .iter()
                    .find_map(Value::as_object)
                    .ok_or(ValidationError::NotAnObject)?;
                warnings.push(Warning::record(
                    "payload was an array, first object element taken",
                ));
                Ok(first.clone())
            }
            _ => Err(ValidationError::NotAnObject),
        }
    }

    /// Move aliased keys onto canonical names. A canonical key already
    /// present always wins over its aliases.
    fn apply_aliases(
        &self,
        raw: &mut Map<String, Value>,
        schema: &SchemaDef,
        warnings: &mut Vec<Warning>,
    ) {
        for (alias, canonical) in schema.aliases {
            if raw.contains_key(*canonical) {
                continue;
            }
            if let Some(value) = raw.remove(*alias) {
                warnings.push(Warning::field(
                    *canonical,
                    format!("filled from alias \"{alias}\""),
                ));
                raw.insert((*canonical).to_string(), value);
            }
        }
    }
}

/// Whether a value counts as "not provided" for required-field purposes.
fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Coerce one field value toward its declared kind.
fn coerce(value: Value, kind: FieldKind, name: &str, warnings: &mut Vec<Warning>) -> Value {
    match kind {
        FieldKind::Text => coerce_text(value, false),
        FieldKind::Line => coerce_text(value, true),
        FieldKind::UnitScore => match as_f64(&value) {
            Some(score) => {
                let clamped = (score.round() as i64).clamp(1, 10);
                if (clamped as f64 - score).abs() > f64::EPSILON {
                    warnings.push(Warning::field(
                        name,
                        format!("score {score} normalized to {clamped}"),
                    ));
                }
                Value::Number(clamped.into())
            }
            None => {
                warnings.push(Warning::field(name, "unreadable score discarded"));
                Value::Null
            }
        },
        FieldKind::QuarterScore => match &value {
            Value::Null => Value::Null,
            _ => match as_f64(&value) {
                Some(score) => {
                    let quarter = (score * 4.0).round() / 4.0;
                    match Number::from_f64(quarter) {
                        Some(n) => Value::Number(n),
                        None => Value::Null,
                    }
                }
                None => {
                    warnings.push(Warning::field(name, "unreadable score discarded"));
                    Value::Null
                }
            },
        },
        FieldKind::List => match value {
            Value::Array(items) => Value::Array(items),
            Value::Null => Value::Array(vec![]),
            scalar => {
                warnings.push(Warning::field(name, "scalar wrapped into a list"));
                Value::Array(vec![coerce_text(scalar, false)])
            }
        },
        FieldKind::Object => value,
    }
}

/// Clean a textual value: strip emoji, trim, optionally keep only the first
/// line. Non-string scalars are stringified.
fn coerce_text(value: Value, first_line_only: bool) -> Value {
    let text = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => return other,
    };
    let cleaned: String = text.chars().filter(|c| !is_emoji(*c)).collect();
    let cleaned = if first_line_only {
        cleaned.lines().next().unwrap_or("").trim().to_string()
    } else {
        cleaned.trim().to_string()
    };
    Value::String(cleaned)
}

fn is_emoji(c: char) -> bool {
    matches!(u32::from(c),
        0x1F000..=0x1FAFF | 0x2600..=0x27BF | 0x2190..=0x21FF | 0xFE0F | 0x200D)
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

//! Canonical schema definitions: fields, aliases, defaults, keywords.
//!
//! There is exactly one definition per [`SchemaId`]. Earlier generations of
//! this pipeline grew two diverging alias/default tables; this module is the
//! single source of truth for both the validator and the fallback parser.

use salvage_core::{SchemaId, TargetShape, Warning};
use serde_json::{Map, Value};

/// How a field's value is shaped and coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text, possibly multi-line.
    Text,
    /// Single-line text: only the first line is kept.
    Line,
    /// Integer score on a 1–10 scale, rounded and clamped.
    UnitScore,
    /// Score rounded to the nearest quarter point.
    QuarterScore,
    /// A JSON array; scalars are list-wrapped.
    List,
    /// A JSON object.
    Object,
}

/// The value a missing field receives, or a marker that it must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    /// No default: the field is required and must be a non-empty string.
    Required,
    /// A fixed string default.
    Text(&'static str),
    /// A fixed integer default.
    Int(i64),
    /// Defaults to `null`.
    Null,
    /// Defaults to `[]`.
    EmptyList,
    /// Defaults to `{}`.
    EmptyObject,
}

/// One field of a canonical schema.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Canonical field name.
    pub name: &'static str,
    /// Shape and coercion rule.
    pub kind: FieldKind,
    /// Default, or `Required`.
    pub default: DefaultValue,
    /// Lowercase keywords used by the fallback parser's affinity scoring.
    pub keywords: &'static [&'static str],
}

impl FieldSpec {
    /// Whether this field must be present and non-empty.
    #[must_use]
    pub fn is_required(&self) -> bool {
        matches!(self.default, DefaultValue::Required)
    }

    /// Materialize the default value. `None` for required fields.
    #[must_use]
    pub fn default_value(&self) -> Option<Value> {
        match self.default {
            DefaultValue::Required => None,
            DefaultValue::Text(s) => Some(Value::String(s.to_string())),
            DefaultValue::Int(n) => Some(Value::from(n)),
            DefaultValue::Null => Some(Value::Null),
            DefaultValue::EmptyList => Some(Value::Array(vec![])),
            DefaultValue::EmptyObject => Some(Value::Object(Map::new())),
        }
    }

    /// Whether the field holds prose the fallback parser can fill.
    #[must_use]
    pub fn is_textual(&self) -> bool {
        matches!(self.kind, FieldKind::Text | FieldKind::Line)
    }
}

/// Hook run after aliasing, for normalization rules specific to one schema.
pub type FinalizeFn = fn(&mut Map<String, Value>, &mut Vec<Warning>);

/// A complete canonical schema definition.
#[derive(Debug)]
pub struct SchemaDef {
    /// Which schema this defines.
    pub id: SchemaId,
    /// Top-level JSON shape the provider should emit.
    pub shape: TargetShape,
    /// Fields in declaration order; fallback strategies fill textual fields
    /// in this order.
    pub fields: &'static [FieldSpec],
    /// Alias table: alternate key → canonical key. Applied only when the
    /// canonical key is absent.
    pub aliases: &'static [(&'static str, &'static str)],
    /// Schema-specific normalization, run after aliasing.
    pub finalize: Option<FinalizeFn>,
}

impl SchemaDef {
    /// The canonical definition for a schema identifier.
    #[must_use]
    pub fn get(id: SchemaId) -> &'static SchemaDef {
        match id {
            SchemaId::IdeaPitch => &IDEA_PITCH,
            SchemaId::DeepDive => &DEEP_DIVE,
        }
    }

    /// Look up a field by canonical name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Required fields, in declaration order.
    pub fn required(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.is_required())
    }

    /// Resolve a free-text label (a section header, say) to a field.
    ///
    /// Matches the canonical name, then the alias table, then keyword
    /// affinity, all case-insensitively.
    #[must_use]
    pub fn field_for_label(&self, label: &str) -> Option<&FieldSpec> {
        let needle = label.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        if let Some(field) = self
            .fields
            .iter()
            .find(|f| f.name.to_lowercase() == needle || f.name.replace('_', " ") == needle)
        {
            return Some(field);
        }
        if let Some((_, canonical)) = self
            .aliases
            .iter()
            .find(|(alias, _)| alias.to_lowercase() == needle)
        {
            return self.field(canonical);
        }
        self.fields
            .iter()
            .find(|f| f.keywords.iter().any(|k| needle.contains(k)))
    }

    /// A compact one-line-per-field description, embedded in correction
    /// prompts during self-healing.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for field in self.fields {
            let kind = match field.kind {
                FieldKind::Text | FieldKind::Line => "string",
                FieldKind::UnitScore => "integer 1-10",
                FieldKind::QuarterScore => "number",
                FieldKind::List => "array",
                FieldKind::Object => "object",
            };
            let req = if field.is_required() {
                ", required, non-empty"
            } else {
                ""
            };
            out.push_str(&format!("- {} ({kind}{req})\n", field.name));
        }
        out
    }
}

// ============================================================================
// Idea pitch
// ============================================================================

/// Placeholder URLs that do not count as a real citation.
pub const PLACEHOLDER_URLS: &[&str] = &[
    "N/A",
    "example.com",
    "http://example.com",
    "https://example.com",
    "#",
];

static IDEA_PITCH: SchemaDef = SchemaDef {
    id: SchemaId::IdeaPitch,
    shape: TargetShape::Object,
    fields: &[
        FieldSpec {
            name: "title",
            kind: FieldKind::Line,
            default: DefaultValue::Required,
            keywords: &["title", "idea", "name"],
        },
        FieldSpec {
            name: "hook",
            kind: FieldKind::Line,
            default: DefaultValue::Required,
            keywords: &["hook", "pitch", "tagline"],
        },
        FieldSpec {
            name: "value",
            kind: FieldKind::Line,
            default: DefaultValue::Text("Value proposition to be defined"),
            keywords: &["value", "proposition", "benefit"],
        },
        FieldSpec {
            name: "evidence",
            kind: FieldKind::Text,
            default: DefaultValue::Text("Market research and validation needed"),
            keywords: &["evidence", "research", "data", "validation"],
        },
        FieldSpec {
            name: "differentiator",
            kind: FieldKind::Text,
            default: DefaultValue::Text("Unique competitive advantage to be defined"),
            keywords: &["differentiator", "unique", "advantage", "different"],
        },
        FieldSpec {
            name: "call_to_action",
            kind: FieldKind::Text,
            default: DefaultValue::Text(""),
            keywords: &["call to action", "next step"],
        },
        FieldSpec {
            name: "score",
            kind: FieldKind::UnitScore,
            default: DefaultValue::Int(5),
            keywords: &["score", "rating"],
        },
        FieldSpec {
            name: "mvp_effort",
            kind: FieldKind::UnitScore,
            default: DefaultValue::Int(5),
            keywords: &["effort", "mvp", "complexity"],
        },
        FieldSpec {
            name: "type",
            kind: FieldKind::Text,
            default: DefaultValue::Text("side_hustle"),
            keywords: &["type", "category"],
        },
        FieldSpec {
            name: "assumptions",
            kind: FieldKind::List,
            default: DefaultValue::EmptyList,
            keywords: &["assumption"],
        },
        FieldSpec {
            name: "evidence_reference",
            kind: FieldKind::Object,
            default: DefaultValue::EmptyObject,
            keywords: &["reference", "citation", "source"],
        },
        FieldSpec {
            name: "repo_usage",
            kind: FieldKind::Text,
            default: DefaultValue::Text("AI-generated idea"),
            keywords: &["repo", "usage"],
        },
    ],
    aliases: &[
        ("idea_name", "title"),
        ("overall_score", "score"),
        ("effort_score", "mvp_effort"),
        ("elevator_pitch", "value"),
        ("core_assumptions", "assumptions"),
    ],
    finalize: Some(finalize_idea_pitch),
};

/// Evidence references must be objects with a real stat and URL; anything
/// else collapses to `{}` so downstream code never sees placeholder links.
fn finalize_idea_pitch(fields: &mut Map<String, Value>, warnings: &mut Vec<Warning>) {
    let Some(reference) = fields.get_mut("evidence_reference") else {
        return;
    };
    match reference.take() {
        Value::String(url) => {
            let mut wrapped = Map::new();
            wrapped.insert("url".to_string(), Value::String(url));
            wrapped.insert("stat".to_string(), Value::String(String::new()));
            *reference = Value::Object(wrapped);
            warnings.push(Warning::field(
                "evidence_reference",
                "bare URL wrapped into a reference object",
            ));
        }
        other => *reference = other,
    }

    let valid = reference.as_object().is_some_and(|obj| {
        let stat = obj.get("stat").and_then(Value::as_str).unwrap_or("");
        let url = obj.get("url").and_then(Value::as_str).unwrap_or("");
        !stat.trim().is_empty()
            && !url.trim().is_empty()
            && !PLACEHOLDER_URLS.contains(&url.trim())
    });
    if !valid && reference != &Value::Object(Map::new()) {
        warnings.push(Warning::field(
            "evidence_reference",
            "missing or placeholder citation, reference cleared",
        ));
        *reference = Value::Object(Map::new());
    }
}

// ============================================================================
// Deep dive
// ============================================================================

static DEEP_DIVE: SchemaDef = SchemaDef {
    id: SchemaId::DeepDive,
    shape: TargetShape::Object,
    fields: &[
        FieldSpec {
            name: "summary",
            kind: FieldKind::Text,
            default: DefaultValue::Text("N/A"),
            keywords: &["summary", "overview"],
        },
        FieldSpec {
            name: "market",
            kind: FieldKind::Text,
            default: DefaultValue::Text("N/A"),
            keywords: &["market", "opportunity", "tam"],
        },
        FieldSpec {
            name: "risks",
            kind: FieldKind::Text,
            default: DefaultValue::Text("N/A"),
            keywords: &["risk", "regulatory", "threat", "compliance"],
        },
        FieldSpec {
            name: "timing",
            kind: FieldKind::Text,
            default: DefaultValue::Text("N/A"),
            keywords: &["timing", "trend", "why now"],
        },
        FieldSpec {
            name: "moat",
            kind: FieldKind::Text,
            default: DefaultValue::Text("N/A"),
            keywords: &["moat", "competition", "competitive", "defensib"],
        },
        FieldSpec {
            name: "customer_validation_plan",
            kind: FieldKind::Text,
            default: DefaultValue::Text("N/A"),
            keywords: &["customer", "interview", "plan"],
        },
        FieldSpec {
            name: "market_size_score",
            kind: FieldKind::QuarterScore,
            default: DefaultValue::Null,
            keywords: &[],
        },
        FieldSpec {
            name: "market_timing_score",
            kind: FieldKind::QuarterScore,
            default: DefaultValue::Null,
            keywords: &[],
        },
        FieldSpec {
            name: "competitive_moat_score",
            kind: FieldKind::QuarterScore,
            default: DefaultValue::Null,
            keywords: &[],
        },
        FieldSpec {
            name: "regulatory_risk_score",
            kind: FieldKind::QuarterScore,
            default: DefaultValue::Null,
            keywords: &[],
        },
        FieldSpec {
            name: "overall_score",
            kind: FieldKind::QuarterScore,
            default: DefaultValue::Null,
            keywords: &["overall", "attractiveness"],
        },
    ],
    aliases: &[
        ("Summary", "summary"),
        ("Market", "market"),
        ("Risks", "risks"),
        ("Timing", "timing"),
        ("Moat", "moat"),
        ("Product", "summary"),
        ("market_size_narrative", "market"),
        ("market_timing_narrative", "timing"),
        ("competitive_moat_narrative", "moat"),
        ("regulatory_risk_narrative", "risks"),
        ("overall_investor_attractiveness_score", "overall_score"),
        ("Overall Investor Attractiveness", "overall_score"),
    ],
    finalize: None,
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_fields() {
        let idea = SchemaDef::get(SchemaId::IdeaPitch);
        let required: Vec<&str> = idea.required().map(|f| f.name).collect();
        assert_eq!(required, vec!["title", "hook"]);

        let dive = SchemaDef::get(SchemaId::DeepDive);
        assert_eq!(dive.required().count(), 0);
    }

    #[test]
    fn test_field_for_label() {
        let dive = SchemaDef::get(SchemaId::DeepDive);
        assert_eq!(dive.field_for_label("Market").unwrap().name, "market");
        assert_eq!(dive.field_for_label("RISKS").unwrap().name, "risks");
        assert_eq!(
            dive.field_for_label("Regulatory concerns").unwrap().name,
            "risks"
        );
        assert!(dive.field_for_label("weather").is_none());
    }

    #[test]
    fn test_describe_mentions_required() {
        let text = SchemaDef::get(SchemaId::IdeaPitch).describe();
        assert!(text.contains("- title (string, required, non-empty)"));
        assert!(text.contains("- score (integer 1-10)"));
    }

    #[test]
    fn test_finalize_clears_placeholder_reference() {
        let mut fields = Map::new();
        fields.insert(
            "evidence_reference".to_string(),
            json!({"stat": "40% CAGR", "url": "https://example.com"}),
        );
        let mut warnings = Vec::new();
        finalize_idea_pitch(&mut fields, &mut warnings);
        assert_eq!(fields["evidence_reference"], json!({}));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_finalize_wraps_bare_url() {
        let mut fields = Map::new();
        fields.insert(
            "evidence_reference".to_string(),
            json!("https://data.example.org/report"),
        );
        let mut warnings = Vec::new();
        finalize_idea_pitch(&mut fields, &mut warnings);
        // Wrapped, but stat is empty, so it is then cleared.
        assert_eq!(fields["evidence_reference"], json!({}));
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_finalize_keeps_real_reference() {
        let mut fields = Map::new();
        fields.insert(
            "evidence_reference".to_string(),
            json!({"stat": "3M users", "url": "https://hn.example.org/item"}),
        );
        let mut warnings = Vec::new();
        finalize_idea_pitch(&mut fields, &mut warnings);
        assert_eq!(
            fields["evidence_reference"]["stat"],
            json!("3M users")
        );
        assert!(warnings.is_empty());
    }
}

//! Heuristic fallback parsing: building a record from free text.
//!
//! When a completion contains no recoverable JSON at all, the pipeline makes
//! one last attempt to segment the prose into schema fields. Everything
//! produced here is tagged [`Provenance::Heuristic`] with
//! [`Confidence::Low`]; callers decide whether such records are worth
//! keeping.

use crate::schema::SchemaDef;
use crate::validate::Normalizer;
use regex::Regex;
use salvage_core::{Confidence, Provenance, ValidatedRecord};
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::info;

/// One way of segmenting free text into schema fields.
pub trait FallbackStrategy: Send + Sync {
    /// Stable identifier, used in log lines.
    fn name(&self) -> &str;

    /// Try to segment `text` into a field map. `None` means the strategy
    /// found nothing to work with.
    fn segment(&self, text: &str, schema: &SchemaDef) -> Option<Map<String, Value>>;
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*#{1,6}\s+(.+?)\s*$").expect("valid header pattern"))
}

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*\*{0,2}([A-Za-z][A-Za-z0-9 _/-]{0,40}?)\*{0,2}:\s*(.*)$")
            .expect("valid label pattern")
    })
}

fn numbered_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d{1,2}[.)]\s+(.+)$").expect("valid numbering pattern"))
}

/// Segments on markdown headers (`## Market`) and `Label: value` lines.
///
/// Section labels are resolved to fields through the schema's names, aliases,
/// and keywords. When the schema requires a title and none was labeled, a
/// short leading line is promoted to the title.
#[derive(Debug, Default)]
pub struct HeaderSections;

impl FallbackStrategy for HeaderSections {
    fn name(&self) -> &str {
        "header_sections"
    }

    fn segment(&self, text: &str, schema: &SchemaDef) -> Option<Map<String, Value>> {
        let mut sections: Vec<(String, String)> = Vec::new();
        let mut preamble = String::new();

        for line in text.lines() {
            if let Some(caps) = header_re().captures(line) {
                sections.push((caps[1].to_string(), String::new()));
            } else if let Some(caps) = label_re().captures(line) {
                sections.push((caps[1].to_string(), caps[2].to_string()));
            } else if let Some((_, body)) = sections.last_mut() {
                body.push_str(line);
                body.push('\n');
            } else {
                preamble.push_str(line);
                preamble.push('\n');
            }
        }
        if sections.is_empty() {
            return None;
        }

        let mut map = Map::new();
        for (label, body) in &sections {
            let Some(field) = schema.field_for_label(label) else {
                continue;
            };
            let body = body.trim();
            if body.is_empty() || map.contains_key(field.name) {
                continue;
            }
            map.insert(field.name.to_string(), Value::String(body.to_string()));
        }

        if !map.contains_key("title") && schema.field("title").is_some_and(|f| f.is_required()) {
            if let Some(line) = preamble.lines().map(str::trim).find(|l| !l.is_empty()) {
                if line.len() <= 80 {
                    map.insert("title".to_string(), Value::String(line.to_string()));
                }
            }
        }

        if map.is_empty() {
            None
        } else {
            Some(map)
        }
    }
}

/// Segments on numbered list items (`1. …`, `2) …`), filling the schema's
/// textual fields in declaration order.
#[derive(Debug, Default)]
pub struct NumberedSections;

impl FallbackStrategy for NumberedSections {
    fn name(&self) -> &str {
        "numbered_sections"
    }

    fn segment(&self, text: &str, schema: &SchemaDef) -> Option<Map<String, Value>> {
        let mut chunks: Vec<String> = Vec::new();
        for line in text.lines() {
            if let Some(caps) = numbered_re().captures(line) {
                chunks.push(caps[1].to_string());
            } else if let Some(chunk) = chunks.last_mut() {
                chunk.push('\n');
                chunk.push_str(line);
            }
        }
        if chunks.len() < 2 {
            return None;
        }

        let mut map = Map::new();
        let mut fields = schema.fields.iter().filter(|f| f.is_textual());
        for chunk in &chunks {
            let Some(field) = fields.next() else { break };
            map.insert(
                field.name.to_string(),
                Value::String(chunk.trim().to_string()),
            );
        }
        Some(map)
    }
}

/// Assigns blank-line-separated paragraphs to the textual field whose
/// keywords they mention most; leftovers fill the first empty field.
#[derive(Debug, Default)]
pub struct KeywordAffinity;

impl FallbackStrategy for KeywordAffinity {
    fn name(&self) -> &str {
        "keyword_affinity"
    }

    fn segment(&self, text: &str, schema: &SchemaDef) -> Option<Map<String, Value>> {
        let paragraphs: Vec<&str> = text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if paragraphs.is_empty() {
            return None;
        }

        let mut map = Map::new();
        let mut leftovers = Vec::new();
        for paragraph in paragraphs {
            let lowered = paragraph.to_lowercase();
            let best = schema
                .fields
                .iter()
                .filter(|f| f.is_textual() && !map.contains_key(f.name))
                .map(|f| {
                    let hits = f
                        .keywords
                        .iter()
                        .filter(|k| lowered.contains(*k))
                        .count();
                    (f, hits)
                })
                .filter(|(_, hits)| *hits > 0)
                .max_by_key(|(_, hits)| *hits);
            match best {
                Some((field, _)) => {
                    map.insert(
                        field.name.to_string(),
                        Value::String(paragraph.to_string()),
                    );
                }
                None => leftovers.push(paragraph),
            }
        }
        for paragraph in leftovers {
            let Some(field) = schema
                .fields
                .iter()
                .find(|f| f.is_textual() && !map.contains_key(f.name))
            else {
                break;
            };
            map.insert(
                field.name.to_string(),
                Value::String(paragraph.to_string()),
            );
        }

        if map.is_empty() {
            None
        } else {
            Some(map)
        }
    }
}

/// The strategies tried, in order.
#[must_use]
pub fn default_strategies() -> Vec<Box<dyn FallbackStrategy>> {
    vec![
        Box::new(HeaderSections),
        Box::new(NumberedSections),
        Box::new(KeywordAffinity),
    ]
}

/// Attempt to build a low-confidence record from free text.
///
/// Strategies run in order; the first whose segmentation survives
/// normalization wins. `None` means no strategy produced anything the schema
/// would accept.
pub fn fallback_parse(
    raw: &str,
    schema: &SchemaDef,
    normalizer: &Normalizer,
) -> Option<ValidatedRecord> {
    for strategy in default_strategies() {
        let Some(map) = strategy.segment(raw, schema) else {
            continue;
        };
        match normalizer.normalize(
            &Value::Object(map),
            schema,
            Provenance::Heuristic,
            Confidence::Low,
        ) {
            Ok((record, _)) => {
                info!(
                    schema = %schema.id,
                    strategy = strategy.name(),
                    "heuristic fallback produced a record"
                );
                return Some(record);
            }
            Err(err) => {
                info!(
                    schema = %schema.id,
                    strategy = strategy.name(),
                    error = %err,
                    "fallback segmentation rejected by validation"
                );
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use salvage_core::SchemaId;

    fn idea() -> &'static SchemaDef {
        SchemaDef::get(SchemaId::IdeaPitch)
    }

    fn dive() -> &'static SchemaDef {
        SchemaDef::get(SchemaId::DeepDive)
    }

    #[test]
    fn test_markdown_headers_fill_deep_dive() {
        let raw = "Overall this looks promising.\n\n## Market\nLarge and growing TAM.\n\n## Risks\nRegulatory exposure in the EU.";
        let record = fallback_parse(raw, dive(), &Normalizer::bare()).unwrap();
        assert_eq!(record.confidence(), Confidence::Low);
        assert_eq!(record.provenance(), Provenance::Heuristic);
        assert_eq!(record.get_str("market"), Some("Large and growing TAM."));
        assert_eq!(
            record.get_str("risks"),
            Some("Regulatory exposure in the EU.")
        );
        // Unlabeled sections fall back to their defaults.
        assert_eq!(record.get_str("summary"), Some("N/A"));
    }

    #[test]
    fn test_label_lines_fill_idea_pitch() {
        let raw = "Title: Crate license auditor\nHook: Know your legal exposure in one command\nValue: Saves a compliance review cycle";
        let record = fallback_parse(raw, idea(), &Normalizer::bare()).unwrap();
        assert_eq!(record.get_str("title"), Some("Crate license auditor"));
        assert_eq!(
            record.get_str("hook"),
            Some("Know your legal exposure in one command")
        );
        assert_eq!(
            record.get_str("value"),
            Some("Saves a compliance review cycle")
        );
    }

    #[test]
    fn test_preamble_line_promoted_to_title() {
        let raw = "Laundry routing service\n\nHook: Never fold again\n";
        let map = HeaderSections.segment(raw, idea()).unwrap();
        assert_eq!(map["title"], "Laundry routing service");
        assert_eq!(map["hook"], "Never fold again");
    }

    #[test]
    fn test_numbered_sections_fill_in_order() {
        let raw = "1. Solid consumer demand overview\n2. The market is huge\n3. Risky regulation ahead";
        let map = NumberedSections.segment(raw, dive()).unwrap();
        // Declaration order: summary, market, risks.
        assert_eq!(map["summary"], "Solid consumer demand overview");
        assert_eq!(map["market"], "The market is huge");
        assert_eq!(map["risks"], "Risky regulation ahead");
    }

    #[test]
    fn test_keyword_affinity_routes_paragraphs() {
        let raw = "The market opportunity here is a large TAM.\n\nThe main regulatory risk is GDPR compliance.";
        let map = KeywordAffinity.segment(raw, dive()).unwrap();
        assert!(map["market"].as_str().unwrap().contains("TAM"));
        assert!(map["risks"].as_str().unwrap().contains("GDPR"));
    }

    #[test]
    fn test_unsalvageable_pitch_returns_none() {
        // Nothing here can satisfy the pitch's required title and hook.
        let raw = "short gibberish";
        assert!(fallback_parse(raw, idea(), &Normalizer::bare()).is_none());
    }
}

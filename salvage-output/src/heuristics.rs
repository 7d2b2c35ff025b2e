//! Soft quality heuristics, run after structural validation.
//!
//! Heuristics only ever attach warnings; they never fail a record. A pitch
//! full of boilerplate is still a schema-valid pitch.

use parking_lot::Mutex;
use salvage_core::Warning;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// A soft check over a record's normalized fields.
pub trait QualityHeuristic: Send + Sync {
    /// Stable identifier, used in log lines.
    fn name(&self) -> &str;

    /// Inspect the fields and report at most one finding.
    fn inspect(&self, fields: &Map<String, Value>) -> Option<Warning>;
}

/// Phrases the provider emits when it has nothing concrete to say. A record
/// dominated by them passed validation but carries no information.
const BOILERPLATE_PHRASES: &[&str] = &[
    "Value proposition to be defined",
    "Market research and validation needed",
    "Unique competitive advantage to be defined",
    "A compelling business opportunity",
    "to be determined",
    "TBD",
    "N/A",
];

/// Flags records whose text fields are mostly placeholder phrases.
#[derive(Debug, Default)]
pub struct BoilerplateDetector;

impl QualityHeuristic for BoilerplateDetector {
    fn name(&self) -> &str {
        "boilerplate"
    }

    fn inspect(&self, fields: &Map<String, Value>) -> Option<Warning> {
        let mut text_fields = 0usize;
        let mut boilerplate = 0usize;
        for value in fields.values() {
            let Some(text) = value.as_str() else { continue };
            if text.trim().is_empty() {
                continue;
            }
            text_fields += 1;
            if BOILERPLATE_PHRASES
                .iter()
                .any(|phrase| text.trim().eq_ignore_ascii_case(phrase))
            {
                boilerplate += 1;
            }
        }
        if text_fields > 0 && boilerplate * 2 >= text_fields {
            Some(Warning::record(format!(
                "{boilerplate} of {text_fields} text fields are placeholder boilerplate"
            )))
        } else {
            None
        }
    }
}

/// Flags records whose evidence reference ended up empty.
#[derive(Debug, Default)]
pub struct CitationCheck;

impl QualityHeuristic for CitationCheck {
    fn name(&self) -> &str {
        "citation"
    }

    fn inspect(&self, fields: &Map<String, Value>) -> Option<Warning> {
        let reference = fields.get("evidence_reference")?;
        let empty = match reference {
            Value::Object(obj) => obj.is_empty(),
            Value::Null => true,
            _ => false,
        };
        if empty {
            Some(Warning::field(
                "evidence_reference",
                "no usable citation backs this record",
            ))
        } else {
            None
        }
    }
}

/// Flags titles already seen in a known corpus (case- and
/// punctuation-insensitive).
#[derive(Debug, Default)]
pub struct DuplicateTitleCheck {
    seen: Mutex<HashSet<String>>,
}

impl DuplicateTitleCheck {
    /// Start with a corpus of existing titles.
    #[must_use]
    pub fn with_titles<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let seen = titles
            .into_iter()
            .map(|t| normalize_title(t.as_ref()))
            .collect();
        Self {
            seen: Mutex::new(seen),
        }
    }
}

fn normalize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl QualityHeuristic for DuplicateTitleCheck {
    fn name(&self) -> &str {
        "duplicate_title"
    }

    fn inspect(&self, fields: &Map<String, Value>) -> Option<Warning> {
        let title = fields.get("title")?.as_str()?;
        let normalized = normalize_title(title);
        if normalized.is_empty() {
            return None;
        }
        let mut seen = self.seen.lock();
        if seen.insert(normalized) {
            None
        } else {
            Some(Warning::field("title", "title duplicates a known record"))
        }
    }
}

/// The heuristics run by default: boilerplate and citation checks.
#[must_use]
pub fn default_heuristics() -> Vec<Box<dyn QualityHeuristic>> {
    vec![
        Box::new(BoilerplateDetector),
        Box::new(CitationCheck),
    ]
}

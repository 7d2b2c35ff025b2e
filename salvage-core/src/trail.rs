//! The append-only diagnostic trail.
//!
//! Every pipeline transition appends exactly one entry. Entries are never
//! edited or removed; the trail is handed back to the caller for external
//! persistence and is not stored by this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum snapshot length stored in a trail entry.
const SNAPSHOT_LIMIT: usize = 400;

/// Truncate a snapshot for the trail, marking elision.
#[must_use]
pub fn snippet(text: &str) -> String {
    if text.chars().count() <= SNAPSHOT_LIMIT {
        return text.to_string();
    }
    let cut: String = text.chars().take(SNAPSHOT_LIMIT).collect();
    format!("{cut}…[truncated]")
}

/// Stages of the pipeline state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// A run was requested.
    Requested,
    /// The provider gateway returned raw text.
    CalledProvider,
    /// A candidate payload was isolated.
    Extracted,
    /// The candidate was repaired into strict form.
    Repaired,
    /// The payload passed schema validation.
    Validated,
    /// No candidate could be extracted or repaired.
    RepairFailed,
    /// The heuristic fallback parser ran.
    HeuristicFallback,
    /// Schema validation rejected the payload.
    ValidationFailed,
    /// A self-heal provider call was issued.
    SelfHeal,
    /// Terminal state.
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Requested => "requested",
            Self::CalledProvider => "called_provider",
            Self::Extracted => "extracted",
            Self::Repaired => "repaired",
            Self::Validated => "validated",
            Self::RepairFailed => "repair_failed",
            Self::HeuristicFallback => "heuristic_fallback",
            Self::ValidationFailed => "validation_failed",
            Self::SelfHeal => "self_heal",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// One transition of the pipeline: stage, input snapshot, and either an
/// output snapshot or an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailEntry {
    /// The stage that ran.
    pub stage: PipelineStage,
    /// Bounded snapshot of the stage input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// Bounded snapshot of the stage output, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Error description, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the transition happened.
    pub at: DateTime<Utc>,
}

/// Ordered, append-only list of pipeline transitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticTrail {
    entries: Vec<TrailEntry>,
}

impl DiagnosticTrail {
    /// Create an empty trail.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a successful transition.
    pub fn record(&mut self, stage: PipelineStage, input: Option<&str>, output: Option<&str>) {
        self.entries.push(TrailEntry {
            stage,
            input: input.map(snippet),
            output: output.map(snippet),
            error: None,
            at: Utc::now(),
        });
    }

    /// Append a failed transition.
    pub fn record_error(&mut self, stage: PipelineStage, input: Option<&str>, error: &str) {
        self.entries.push(TrailEntry {
            stage,
            input: input.map(snippet),
            output: None,
            error: Some(snippet(error)),
            at: Utc::now(),
        });
    }

    /// All entries, in order of occurrence.
    pub fn entries(&self) -> &[TrailEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries for a given stage.
    pub fn stage_entries(&self, stage: PipelineStage) -> impl Iterator<Item = &TrailEntry> {
        self.entries.iter().filter(move |e| e.stage == stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_append_only_ordering() {
        let mut trail = DiagnosticTrail::new();
        trail.record(PipelineStage::Requested, Some("prompt"), None);
        trail.record(PipelineStage::CalledProvider, None, Some("raw"));
        trail.record_error(PipelineStage::ValidationFailed, Some("{}"), "missing: hook");

        assert_eq!(trail.len(), 3);
        assert_eq!(trail.entries()[0].stage, PipelineStage::Requested);
        assert_eq!(trail.entries()[2].error.as_deref(), Some("missing: hook"));
    }

    #[test]
    fn test_snippet_truncates() {
        let long = "x".repeat(1000);
        let s = snippet(&long);
        assert!(s.len() < long.len());
        assert!(s.ends_with("[truncated]"));
        assert_eq!(snippet("short"), "short");
    }

    #[test]
    fn test_stage_filter() {
        let mut trail = DiagnosticTrail::new();
        trail.record(PipelineStage::SelfHeal, None, None);
        trail.record(PipelineStage::SelfHeal, None, None);
        trail.record(PipelineStage::Done, None, None);
        assert_eq!(trail.stage_entries(PipelineStage::SelfHeal).count(), 2);
    }
}

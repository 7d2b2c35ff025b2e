//! Candidate payloads and provenance markers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a candidate payload (or a finished record) was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Content of a fenced code block.
    CodeFence,
    /// A balanced brace/bracket span located by depth scanning.
    BraceScan,
    /// The whole completion text, taken as-is.
    WholeText,
    /// Assembled by the heuristic fallback parser from free text.
    Heuristic,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CodeFence => "code_fence",
            Self::BraceScan => "brace_scan",
            Self::WholeText => "whole_text",
            Self::Heuristic => "heuristic",
        };
        f.write_str(s)
    }
}

/// A substring of a completion hypothesized to encode structured data.
///
/// Candidates are immutable: each extraction or repair stage that changes the
/// text produces a new candidate rather than editing one in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    text: String,
    provenance: Provenance,
}

impl Candidate {
    /// Create a candidate.
    #[must_use]
    pub fn new(text: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            text: text.into(),
            provenance,
        }
    }

    /// The candidate text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Where the candidate came from.
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// A new candidate with different text but the same provenance.
    #[must_use]
    pub fn replaced(&self, text: impl Into<String>) -> Self {
        Self::new(text, self.provenance)
    }
}

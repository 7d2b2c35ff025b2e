//! Target schema identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies which canonical output schema a completion must satisfy.
///
/// Each identifier maps to exactly one alias table, default table, and
/// required-field set in `salvage-output`. There is deliberately a single
/// canonical definition per schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaId {
    /// A single pitched idea: title, hook, value proposition, scores.
    IdeaPitch,
    /// An investor-style deep dive: narrative sections plus quarter-point scores.
    DeepDive,
}

impl SchemaId {
    /// The structural shape the provider is expected to emit for this schema.
    #[must_use]
    pub fn shape(&self) -> TargetShape {
        match self {
            Self::IdeaPitch => TargetShape::Object,
            Self::DeepDive => TargetShape::Object,
        }
    }

    /// Stable string form, used in logs and the diagnostic trail.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdeaPitch => "idea_pitch",
            Self::DeepDive => "deep_dive",
        }
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaId {
    type Err = UnknownSchema;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idea_pitch" | "idea" => Ok(Self::IdeaPitch),
            "deep_dive" => Ok(Self::DeepDive),
            other => Err(UnknownSchema(other.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized schema identifier.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown schema identifier: {0}")]
pub struct UnknownSchema(pub String);

/// The top-level JSON shape the extractor should look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetShape {
    /// A single `{ ... }` object.
    Object,
    /// A `[ { ... } ]` array of objects.
    Array,
}

//! Error types for extraction, repair, and validation.

use thiserror::Error;

/// Failure of the syntax repair engine.
#[derive(Debug, Clone, Error)]
pub enum RepairError {
    /// The text contains no brace or bracket structure to recover.
    #[error("no recoverable brace or bracket structure in text")]
    NoStructure,
    /// A structure was found but could not be read even tolerantly.
    #[error("unreadable structure at offset {offset}: {message}")]
    Unreadable {
        /// Byte offset of the failure.
        offset: usize,
        /// What went wrong.
        message: String,
    },
}

/// Failure of schema validation. Triggers the self-heal loop, not a fatal
/// error.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// The repaired payload was not an object (or an array containing one).
    #[error("payload is not an object")]
    NotAnObject,
    /// One or more required fields are absent or empty.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
}

impl ValidationError {
    /// The names of the missing fields, when that is what failed.
    #[must_use]
    pub fn missing_fields(&self) -> &[String] {
        match self {
            Self::MissingFields(fields) => fields,
            Self::NotAnObject => &[],
        }
    }
}

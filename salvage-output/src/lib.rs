//! # salvage-output
//!
//! The text-wrangling half of the salvage pipeline: isolating a structured
//! candidate from raw completion text, repairing near-valid JSON into strict
//! form, validating and normalizing it against a canonical schema, and, when
//! nothing parseable exists at all, assembling a low-confidence record from
//! free text by heuristics.
//!
//! Everything in this crate is synchronous, CPU-bound, and side-effect free;
//! stages consume immutable candidates and produce new ones.
//!
//! ## Pipeline order
//!
//! 1. [`extract`]: find the most likely structured-data substring.
//! 2. [`repair`] / [`tolerant_parse`]: coerce near-valid text into strict JSON.
//! 3. [`Normalizer::normalize`]: alias, coerce, enforce, default, filter.
//! 4. [`fallback_parse`]: only when steps 1 and 2 fail outright.
//!
//! ## Example
//!
//! ```rust
//! use salvage_core::{Confidence, Provenance, SchemaId};
//! use salvage_output::{extract, tolerant_parse, Normalizer, SchemaDef};
//!
//! let raw = "Sure! Here's your idea:\n```json\n{title: 'A', hook: 'B',}\n```";
//! let schema = SchemaDef::get(SchemaId::IdeaPitch);
//! let candidate = extract(raw, schema.shape).unwrap();
//! let value = tolerant_parse(candidate.text()).unwrap();
//! let (record, _warnings) = Normalizer::new()
//!     .normalize(&value, schema, candidate.provenance(), Confidence::Normal)
//!     .unwrap();
//! assert_eq!(record.get_str("title"), Some("A"));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod extract;
pub mod fallback;
pub mod heuristics;
pub mod repair;
pub mod schema;
pub mod validate;

pub use error::{RepairError, ValidationError};
pub use extract::extract;
pub use fallback::{
    fallback_parse, FallbackStrategy, HeaderSections, KeywordAffinity, NumberedSections,
};
pub use heuristics::{
    default_heuristics, BoilerplateDetector, CitationCheck, DuplicateTitleCheck, QualityHeuristic,
};
pub use repair::{repair, tolerant_parse};
pub use schema::{DefaultValue, FieldKind, FieldSpec, SchemaDef};
pub use validate::Normalizer;

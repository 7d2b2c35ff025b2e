//! # salvage-core
//!
//! Core types for the salvage pipeline: completion requests and results,
//! candidate payloads, validated and error records, the diagnostic trail,
//! and environment-driven configuration.
//!
//! Everything here is plain data. The network side lives in
//! `salvage-gateway`, the text-wrangling side in `salvage-output`, and the
//! orchestration in the `salvage` facade crate.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod candidate;
pub mod config;
pub mod record;
pub mod request;
pub mod schema_id;
pub mod trail;
pub mod usage;

pub use candidate::{Candidate, Provenance};
pub use config::{ConfigError, SalvageConfig};
pub use record::{Confidence, ErrorRecord, ValidatedRecord, Warning};
pub use request::{CompletionRequest, CompletionResult};
pub use schema_id::{SchemaId, TargetShape};
pub use trail::{snippet, DiagnosticTrail, PipelineStage, TrailEntry};
pub use usage::TokenUsage;

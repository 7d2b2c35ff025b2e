//! # salvage
//!
//! A resilient extraction-and-validation pipeline for structured LLM output.
//!
//! Large-language-model providers return text that is *supposed* to be JSON
//! and frequently is not: wrapped in chatter and code fences, sprinkled with
//! trailing commas and single quotes, truncated mid-object, or pure prose.
//! `salvage` turns those replies into schema-valid records anyway, or into an
//! explicit error record when nothing can be recovered. It never produces
//! silently wrong data.
//!
//! The pipeline, in order:
//!
//! 1. **Gateway** ([`salvage_gateway`]): calls the provider, rotating
//!    through a pool of credentials and honoring rate limits.
//! 2. **Extraction**: isolates the most likely structured substring.
//! 3. **Repair**: tolerantly parses near-valid JSON into strict form.
//! 4. **Validation**: aliases, coerces, defaults, and enforces the target
//!    schema.
//! 5. **Self-heal**: on validation failure, asks the model to correct its
//!    own reply, a bounded number of times.
//! 6. **Heuristic fallback**: on unparseable prose, segments free text into
//!    fields and tags the result low-confidence.
//!
//! Every run returns a [`DiagnosticTrail`] recording each transition, so a
//! bad outcome is always explainable after the fact.
//!
//! ## Example
//!
//! ```rust,no_run
//! use salvage::{CompletionRequest, Pipeline, SchemaId};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let pipeline = Pipeline::from_env()?;
//! let request = CompletionRequest::new("Pitch me a developer-tool startup", SchemaId::IdeaPitch);
//! let outcome = pipeline.process(&request).await;
//! match outcome.record {
//!     Ok(record) => println!("title: {:?}", record.get_str("title")),
//!     Err(error) => eprintln!("unrecoverable: {error}"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod heal;
mod options;
mod pipeline;

pub use options::ProcessOptions;
pub use pipeline::{Outcome, Pipeline};

pub use salvage_core::{
    Candidate, CompletionRequest, CompletionResult, Confidence, ConfigError, DiagnosticTrail,
    ErrorRecord, PipelineStage, Provenance, SalvageConfig, SchemaId, TargetShape, TokenUsage,
    TrailEntry, ValidatedRecord, Warning,
};
pub use salvage_gateway::{Gateway, GatewayError, MockTransport, Transport, TransportError};
pub use salvage_output::{
    extract, fallback_parse, repair, tolerant_parse, Normalizer, QualityHeuristic, RepairError,
    SchemaDef, ValidationError,
};

/// Everything most callers need, in one import.
pub mod prelude {
    pub use crate::{
        CompletionRequest, Confidence, ErrorRecord, Outcome, Pipeline, ProcessOptions, Provenance,
        SalvageConfig, SchemaId, ValidatedRecord,
    };
}

//! The pipeline orchestrator.
//!
//! One `process` call drives a completion through the fixed state machine:
//! call the provider, extract a candidate, repair it, validate it. A
//! validation failure triggers the self-heal loop; an unparseable completion
//! triggers the heuristic fallback parser. Every transition is appended to a
//! [`DiagnosticTrail`] that is returned with the outcome, whatever happened.

use crate::heal;
use crate::options::ProcessOptions;
use salvage_core::{
    CompletionRequest, Confidence, ConfigError, DiagnosticTrail, ErrorRecord, PipelineStage,
    SalvageConfig, TokenUsage, ValidatedRecord, snippet,
};
use salvage_gateway::Gateway;
use salvage_output::{
    extract, fallback_parse, tolerant_parse, Normalizer, RepairError, SchemaDef, ValidationError,
};
use tracing::{info, warn};

/// The result of one pipeline run: a record or an error record, plus the
/// diagnostic trail and accumulated token usage.
///
/// `process` itself never fails; terminal failures are expressed as an
/// [`ErrorRecord`], which downstream code must branch on and must never
/// persist as data.
#[derive(Debug)]
pub struct Outcome {
    /// The validated record, or the terminal failure marker.
    pub record: Result<ValidatedRecord, ErrorRecord>,
    /// Every stage transition of this run, in order.
    pub trail: DiagnosticTrail,
    /// Token usage summed over the initial call and all heal calls.
    pub usage: TokenUsage,
}

impl Outcome {
    /// True when the run produced a validated record.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.record.is_ok()
    }
}

/// Why a structured attempt over one completion did not produce a record.
#[derive(Debug)]
enum StructuredFailure {
    /// Nothing parseable was recovered from the text.
    Repair(RepairError),
    /// The payload parsed but failed schema validation.
    Validation(ValidationError),
}

impl StructuredFailure {
    fn message(&self) -> String {
        match self {
            Self::Repair(err) => err.to_string(),
            Self::Validation(err) => err.to_string(),
        }
    }
}

/// The orchestrator. Owns a gateway and a normalizer; cheap to share behind
/// a reference, `process` takes `&self`.
#[derive(Debug)]
pub struct Pipeline {
    gateway: Gateway,
    normalizer: Normalizer,
    options: ProcessOptions,
}

impl Pipeline {
    /// A pipeline over an existing gateway, with default options.
    #[must_use]
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            normalizer: Normalizer::new(),
            options: ProcessOptions::default(),
        }
    }

    /// A pipeline from configuration, using the HTTP transport.
    pub fn from_config(config: &SalvageConfig) -> Result<Self, ConfigError> {
        let gateway = Gateway::from_config(config)?;
        let options = ProcessOptions::new().with_max_heal_retries(config.max_heal_retries);
        Ok(Self::new(gateway).with_options(options))
    }

    /// A pipeline from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_config(&SalvageConfig::from_env()?)
    }

    /// Apply processing options.
    #[must_use]
    pub fn with_options(mut self, options: ProcessOptions) -> Self {
        self.normalizer = if options.known_titles.is_empty() {
            Normalizer::new()
        } else {
            Normalizer::new().with_known_titles(options.known_titles.iter().map(String::as_str))
        };
        self.options = options;
        self
    }

    /// The gateway backing this pipeline.
    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Run one completion request through the full pipeline.
    pub async fn process(&self, request: &CompletionRequest) -> Outcome {
        let schema = SchemaDef::get(request.schema());
        let mut trail = DiagnosticTrail::new();
        let mut usage = TokenUsage::default();

        trail.record(PipelineStage::Requested, Some(request.prompt()), None);
        info!(schema = %schema.id, "pipeline run started");

        let first = match self.gateway.complete(request).await {
            Ok(result) => result,
            Err(err) => {
                warn!(schema = %schema.id, error = %err, "provider gateway failed");
                trail.record_error(
                    PipelineStage::CalledProvider,
                    Some(request.prompt()),
                    &err.to_string(),
                );
                return Outcome {
                    record: Err(ErrorRecord::new(
                        request.schema(),
                        PipelineStage::CalledProvider,
                        vec![err.to_string()],
                    )),
                    trail,
                    usage,
                };
            }
        };
        usage.merge(&first.usage);
        trail.record(PipelineStage::CalledProvider, None, Some(&first.text));

        let mut raw = first.text;
        match self.attempt_structured(&raw, schema, &mut trail) {
            Ok(record) => return self.finish(record, trail, usage),
            Err(StructuredFailure::Repair(err)) => {
                self.salvage_unparseable(&raw, schema, err, trail, usage)
            }
            Err(StructuredFailure::Validation(err)) => {
                let mut errors = vec![err.to_string()];
                for round in 1..=self.options.max_heal_retries {
                    let prompt = heal::correction_prompt(schema, &errors, &raw);
                    info!(schema = %schema.id, round, "issuing self-heal call");
                    trail.record(PipelineStage::SelfHeal, Some(&prompt), None);

                    let model = request
                        .model()
                        .unwrap_or_else(|| self.gateway.default_model())
                        .to_string();
                    match self
                        .gateway
                        .call(&prompt, &model, request.max_attempts())
                        .await
                    {
                        Ok(result) => {
                            usage.merge(&result.usage);
                            trail.record(PipelineStage::CalledProvider, None, Some(&result.text));
                            raw = result.text;
                            match self.attempt_structured(&raw, schema, &mut trail) {
                                Ok(record) => return self.finish(record, trail, usage),
                                Err(failure) => errors.push(failure.message()),
                            }
                        }
                        Err(err) => {
                            trail.record_error(
                                PipelineStage::CalledProvider,
                                Some(&prompt),
                                &err.to_string(),
                            );
                            errors.push(err.to_string());
                            break;
                        }
                    }
                }
                warn!(schema = %schema.id, "self-heal budget exhausted");
                Outcome {
                    record: Err(ErrorRecord::new(
                        request.schema(),
                        PipelineStage::SelfHeal,
                        errors,
                    )
                    .with_raw(snippet(&raw))),
                    trail,
                    usage,
                }
            }
        }
    }

    /// Extract, repair, and validate one completion text.
    fn attempt_structured(
        &self,
        raw: &str,
        schema: &SchemaDef,
        trail: &mut DiagnosticTrail,
    ) -> Result<ValidatedRecord, StructuredFailure> {
        let Some(candidate) = extract(raw, schema.shape) else {
            trail.record_error(
                PipelineStage::RepairFailed,
                Some(raw),
                "no recoverable structure in completion",
            );
            return Err(StructuredFailure::Repair(RepairError::NoStructure));
        };
        trail.record(PipelineStage::Extracted, Some(raw), Some(candidate.text()));

        let value = match tolerant_parse(candidate.text()) {
            Ok(value) => value,
            Err(err) => {
                trail.record_error(
                    PipelineStage::RepairFailed,
                    Some(candidate.text()),
                    &err.to_string(),
                );
                return Err(StructuredFailure::Repair(err));
            }
        };
        let strict = value.to_string();
        trail.record(PipelineStage::Repaired, Some(candidate.text()), Some(&strict));

        match self.normalizer.normalize(
            &value,
            schema,
            candidate.provenance(),
            Confidence::Normal,
        ) {
            Ok((record, warnings)) => {
                trail.record(
                    PipelineStage::Validated,
                    Some(&strict),
                    Some(&format!("{} warnings", warnings.len())),
                );
                Ok(record)
            }
            Err(err) => {
                trail.record_error(PipelineStage::ValidationFailed, Some(&strict), &err.to_string());
                Err(StructuredFailure::Validation(err))
            }
        }
    }

    /// Last resort for completions with no recoverable structure.
    fn salvage_unparseable(
        &self,
        raw: &str,
        schema: &SchemaDef,
        repair_error: RepairError,
        mut trail: DiagnosticTrail,
        usage: TokenUsage,
    ) -> Outcome {
        let mut errors = vec![repair_error.to_string()];
        let stage = if self.options.heuristic_fallback {
            trail.record(PipelineStage::HeuristicFallback, Some(raw), None);
            if let Some(record) = fallback_parse(raw, schema, &self.normalizer) {
                return self.finish(record, trail, usage);
            }
            trail.record_error(
                PipelineStage::HeuristicFallback,
                Some(raw),
                "no fallback strategy produced a record",
            );
            errors.push("heuristic fallback produced nothing".to_string());
            PipelineStage::HeuristicFallback
        } else {
            PipelineStage::RepairFailed
        };
        warn!(schema = %schema.id, "completion was unsalvageable");
        Outcome {
            record: Err(ErrorRecord::new(schema.id, stage, errors).with_raw(snippet(raw))),
            trail,
            usage,
        }
    }

    fn finish(
        &self,
        record: ValidatedRecord,
        mut trail: DiagnosticTrail,
        usage: TokenUsage,
    ) -> Outcome {
        trail.record(
            PipelineStage::Done,
            None,
            Some(&format!(
                "{} record via {}",
                record.schema(),
                record.provenance()
            )),
        );
        info!(
            schema = %record.schema(),
            provenance = %record.provenance(),
            notes = record.notes().len(),
            "pipeline run finished"
        );
        Outcome {
            record: Ok(record),
            trail,
            usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvage_core::{Provenance, SchemaId};
    use salvage_gateway::{CredentialPool, MockTransport, ProviderReply, TransportError};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn pipeline(transport: MockTransport) -> (Pipeline, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let pool = CredentialPool::new(vec!["key-alpha-0001".into(), "key-beta-0002".into()])
            .unwrap();
        let gateway = Gateway::new(transport.clone(), pool, Duration::from_millis(1), "mock");
        (Pipeline::new(gateway), transport)
    }

    fn usage(p: u64, c: u64) -> TokenUsage {
        TokenUsage::with_tokens(p, c)
    }

    #[tokio::test]
    async fn test_chatty_fenced_reply_yields_record() {
        let raw = "Sure thing! Here's an idea you might like:\n\
                   ```json\n{title: 'Crate auditor', hook: 'Audit in one command', score: 8,}\n```\n\
                   Let me know if you want more.";
        let (pipeline, transport) = pipeline(MockTransport::new().with_reply(ProviderReply {
            content: raw.into(),
            usage: usage(100, 40),
        }));

        let outcome = pipeline
            .process(&CompletionRequest::new("pitch me", SchemaId::IdeaPitch))
            .await;

        let record = outcome.record.unwrap();
        assert_eq!(record.get_str("title"), Some("Crate auditor"));
        assert_eq!(record.get("score"), Some(&json!(8)));
        assert_eq!(record.provenance(), Provenance::CodeFence);
        assert_eq!(record.confidence(), Confidence::Normal);
        assert_eq!(transport.call_count(), 1);
        assert_eq!(outcome.usage.total_tokens, Some(140));

        let stages: Vec<PipelineStage> =
            outcome.trail.entries().iter().map(|e| e.stage).collect();
        assert_eq!(
            stages,
            vec![
                PipelineStage::Requested,
                PipelineStage::CalledProvider,
                PipelineStage::Extracted,
                PipelineStage::Repaired,
                PipelineStage::Validated,
                PipelineStage::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_validation_failure_heals_and_recovers() {
        let (pipeline, transport) = pipeline(
            MockTransport::new()
                .with_text(r#"{"title": "Missing the hook"}"#)
                .with_reply(ProviderReply {
                    content: r#"{"title": "Missing the hook", "hook": "Found it"}"#.into(),
                    usage: usage(50, 20),
                }),
        );

        let outcome = pipeline
            .process(&CompletionRequest::new("pitch me", SchemaId::IdeaPitch))
            .await;

        let record = outcome.record.unwrap();
        assert_eq!(record.get_str("hook"), Some("Found it"));
        assert_eq!(transport.call_count(), 2);
        // The heal prompt names the failing field and shows the old reply.
        let heal_prompt = &transport.recorded()[1].prompt;
        assert!(heal_prompt.contains("hook"));
        assert!(heal_prompt.contains("Missing the hook"));
        assert_eq!(
            outcome.trail.stage_entries(PipelineStage::SelfHeal).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_heal_budget_bounds_provider_calls() {
        // Every reply is valid JSON that keeps failing validation.
        let transport = MockTransport::new();
        let (pipeline, transport) = pipeline(transport);
        let pipeline =
            pipeline.with_options(ProcessOptions::new().with_max_heal_retries(2));

        let outcome = pipeline
            .process(&CompletionRequest::new("pitch me", SchemaId::IdeaPitch))
            .await;

        // Initial call plus exactly max_heal_retries correction calls.
        assert_eq!(transport.call_count(), 3);
        let error = outcome.record.unwrap_err();
        assert_eq!(error.stage, PipelineStage::SelfHeal);
        assert!(error.errors.iter().any(|e| e.contains("title")));
        assert!(error.raw.is_some());
        assert_eq!(
            outcome.trail.stage_entries(PipelineStage::SelfHeal).count(),
            2
        );
    }

    #[tokio::test]
    async fn test_prose_reply_falls_back_to_heuristics() {
        let raw = "This startup looks viable overall.\n\n\
                   ## Market\nA large and growing segment.\n\n\
                   ## Risks\nHeavy regulatory burden in the EU.";
        let (pipeline, transport) = pipeline(MockTransport::new().with_text(raw));

        let outcome = pipeline
            .process(&CompletionRequest::new("analyze", SchemaId::DeepDive))
            .await;

        let record = outcome.record.unwrap();
        assert_eq!(record.confidence(), Confidence::Low);
        assert_eq!(record.provenance(), Provenance::Heuristic);
        assert_eq!(
            record.get_str("market"),
            Some("A large and growing segment.")
        );
        assert_eq!(transport.call_count(), 1);
        assert_eq!(
            outcome
                .trail
                .stage_entries(PipelineStage::HeuristicFallback)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_unsalvageable_prose_yields_error_record() {
        let (pipeline, _) =
            pipeline(MockTransport::new().with_text("total gibberish with no structure"));

        let outcome = pipeline
            .process(&CompletionRequest::new("pitch me", SchemaId::IdeaPitch))
            .await;

        let error = outcome.record.unwrap_err();
        assert_eq!(error.stage, PipelineStage::HeuristicFallback);
        assert!(error.raw.as_deref().unwrap().contains("gibberish"));
    }

    #[tokio::test]
    async fn test_fallback_can_be_disabled() {
        let (pipeline, _) =
            pipeline(MockTransport::new().with_text("## Market\nBig market, no JSON."));
        let pipeline =
            pipeline.with_options(ProcessOptions::new().with_heuristic_fallback(false));

        let outcome = pipeline
            .process(&CompletionRequest::new("analyze", SchemaId::DeepDive))
            .await;

        assert!(!outcome.is_success());
        assert_eq!(
            outcome
                .trail
                .stage_entries(PipelineStage::HeuristicFallback)
                .count(),
            0
        );
    }

    #[tokio::test]
    async fn test_fatal_gateway_error_yields_error_record() {
        let (pipeline, transport) = pipeline(MockTransport::new().with_error(
            TransportError::Http {
                status: 401,
                body: "bad key".into(),
            },
        ));

        let outcome = pipeline
            .process(&CompletionRequest::new("pitch me", SchemaId::IdeaPitch))
            .await;

        let error = outcome.record.unwrap_err();
        assert_eq!(error.stage, PipelineStage::CalledProvider);
        assert!(error.errors[0].contains("401"));
        assert_eq!(transport.call_count(), 1);
        assert!(outcome.usage.is_empty());
    }

    #[tokio::test]
    async fn test_usage_accumulates_across_heal_rounds() {
        let (pipeline, _) = pipeline(
            MockTransport::new()
                .with_reply(ProviderReply {
                    content: r#"{"title": "A"}"#.into(),
                    usage: usage(100, 30),
                })
                .with_reply(ProviderReply {
                    content: r#"{"title": "A", "hook": "B"}"#.into(),
                    usage: usage(120, 25),
                }),
        );

        let outcome = pipeline
            .process(&CompletionRequest::new("pitch me", SchemaId::IdeaPitch))
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.usage.prompt_tokens, Some(220));
        assert_eq!(outcome.usage.completion_tokens, Some(55));
    }

    #[tokio::test]
    async fn test_known_titles_flag_duplicates() {
        let (pipeline, _) = pipeline(
            MockTransport::new().with_text(r#"{"title": "AI Meal Planner", "hook": "Eat well"}"#),
        );
        let pipeline = pipeline
            .with_options(ProcessOptions::new().with_known_titles(["AI Meal Planner"]));

        let outcome = pipeline
            .process(&CompletionRequest::new("pitch me", SchemaId::IdeaPitch))
            .await;

        let record = outcome.record.unwrap();
        assert!(record
            .notes()
            .iter()
            .any(|w| w.message.contains("duplicates")));
    }
}

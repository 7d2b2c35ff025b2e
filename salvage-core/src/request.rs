//! Completion requests.

use crate::schema_id::SchemaId;
use crate::usage::TokenUsage;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default sampling temperature for generation calls.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default completion size cap.
pub const DEFAULT_MAX_TOKENS: u32 = 3000;
/// Default number of gateway attempts per logical request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// An immutable request for one structured completion.
///
/// Built once by the caller and never modified afterwards; retries and
/// self-heal calls construct fresh requests rather than mutating this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    prompt: String,
    schema: SchemaId,
    model: Option<String>,
    temperature: f32,
    max_tokens: u32,
    max_attempts: u32,
}

impl CompletionRequest {
    /// Create a request with default generation parameters.
    pub fn new(prompt: impl Into<String>, schema: SchemaId) -> Self {
        Self {
            prompt: prompt.into(),
            schema,
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Override the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the completion size cap.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Override the gateway attempt budget.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// The prompt text.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The target schema.
    pub fn schema(&self) -> SchemaId {
        self.schema
    }

    /// The requested model, if overridden.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Sampling temperature.
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Completion size cap.
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Gateway attempt budget.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// The raw outcome of one successful gateway call.
#[derive(Debug, Clone)]
pub struct CompletionResult {
    /// Raw text returned by the provider.
    pub text: String,
    /// Token usage, when reported.
    pub usage: TokenUsage,
    /// Wall-clock latency of the call, including rate-limit sleeps.
    pub latency: Duration,
}

impl CompletionResult {
    /// Create a result.
    #[must_use]
    pub fn new(text: impl Into<String>, usage: TokenUsage, latency: Duration) -> Self {
        Self {
            text: text.into(),
            usage,
            latency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let req = CompletionRequest::new("generate", SchemaId::IdeaPitch);
        assert_eq!(req.temperature(), DEFAULT_TEMPERATURE);
        assert_eq!(req.max_tokens(), DEFAULT_MAX_TOKENS);
        assert_eq!(req.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert!(req.model().is_none());
    }

    #[test]
    fn test_attempts_floor() {
        let req = CompletionRequest::new("p", SchemaId::DeepDive).with_max_attempts(0);
        assert_eq!(req.max_attempts(), 1);
    }
}

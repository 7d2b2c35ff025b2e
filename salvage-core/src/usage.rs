//! Token usage accounting for provider calls.

use serde::{Deserialize, Serialize};

/// Token usage reported by the provider for a single completion.
///
/// Providers do not always report usage, so every field is optional. Usage
/// records merge additively so a pipeline run can accumulate usage across the
/// initial call and any self-heal calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    /// Tokens in the completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    /// Total tokens, when the provider reports it directly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl TokenUsage {
    /// Create an empty usage record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create usage from prompt and completion token counts.
    #[must_use]
    pub fn with_tokens(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens: Some(prompt_tokens),
            completion_tokens: Some(completion_tokens),
            total_tokens: Some(prompt_tokens + completion_tokens),
        }
    }

    /// Merge another usage record into this one, summing known counts.
    pub fn merge(&mut self, other: &TokenUsage) {
        self.prompt_tokens = sum_opt(self.prompt_tokens, other.prompt_tokens);
        self.completion_tokens = sum_opt(self.completion_tokens, other.completion_tokens);
        self.total_tokens = sum_opt(self.total_tokens, other.total_tokens);
    }

    /// True when the provider reported nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prompt_tokens.is_none()
            && self.completion_tokens.is_none()
            && self.total_tokens.is_none()
    }
}

fn sum_opt(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

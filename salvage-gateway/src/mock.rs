//! A scripted transport for testing.

use crate::transport::{ProviderReply, ProviderRequest, Transport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use salvage_core::TokenUsage;
use std::collections::VecDeque;

/// One recorded call to a [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Model requested.
    pub model: String,
    /// Prompt sent.
    pub prompt: String,
    /// Suffix of the credential used, matching what the gateway logs.
    pub credential_suffix: String,
}

/// A transport that replays a scripted queue of outcomes.
///
/// Outcomes are consumed in order; once the queue is empty every further call
/// returns an empty-object completion. All calls are recorded so tests can
/// assert on rotation and call counts.
///
/// # Example
///
/// ```rust
/// use salvage_gateway::{MockTransport, TransportError};
///
/// let transport = MockTransport::new()
///     .with_error(TransportError::RateLimited { retry_after: None })
///     .with_text(r#"{"title": "A"}"#);
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Result<ProviderReply, TransportError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    /// Create a transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a full reply.
    #[must_use]
    pub fn with_reply(self, reply: ProviderReply) -> Self {
        self.script.lock().push_back(Ok(reply));
        self
    }

    /// Queue a plain-text completion.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_reply(ProviderReply {
            content: text.into(),
            usage: TokenUsage::default(),
        })
    }

    /// Queue an error outcome.
    #[must_use]
    pub fn with_error(self, error: TransportError) -> Self {
        self.script.lock().push_back(Err(error));
        self
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// All recorded calls, in order.
    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        request: &ProviderRequest,
        credential: &str,
    ) -> Result<ProviderReply, TransportError> {
        let suffix_start = credential
            .char_indices()
            .rev()
            .nth(3)
            .map_or(0, |(i, _)| i);
        self.calls.lock().push(RecordedCall {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            credential_suffix: credential[suffix_start..].to_string(),
        });

        match self.script.lock().pop_front() {
            Some(outcome) => outcome,
            None => Ok(ProviderReply {
                content: "{}".to_string(),
                usage: TokenUsage::default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_order_and_recording() {
        let transport = MockTransport::new()
            .with_text("first")
            .with_error(TransportError::Malformed("broken".into()));

        let request = ProviderRequest {
            model: "m".into(),
            prompt: "p".into(),
            temperature: 0.7,
            max_tokens: 100,
        };

        let first = transport.send(&request, "cred-1234").await.unwrap();
        assert_eq!(first.content, "first");
        assert!(transport.send(&request, "cred-5678").await.is_err());
        // Exhausted scripts fall back to an empty object.
        let third = transport.send(&request, "cred-1234").await.unwrap();
        assert_eq!(third.content, "{}");

        let calls = transport.recorded();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].credential_suffix, "1234");
        assert_eq!(calls[1].credential_suffix, "5678");
    }

    #[tokio::test]
    async fn test_non_ascii_credential_recorded() {
        let transport = MockTransport::new().with_text("ok");
        let request = ProviderRequest {
            model: "m".into(),
            prompt: "p".into(),
            temperature: 0.7,
            max_tokens: 100,
        };
        transport.send(&request, "sk-секрет").await.unwrap();
        assert_eq!(transport.recorded()[0].credential_suffix, "крет");
    }
}

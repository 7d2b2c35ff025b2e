//! The transport seam: how a single provider attempt is actually sent.
//!
//! [`Gateway`](crate::Gateway) drives retries and credential rotation; a
//! [`Transport`] only knows how to send one request with one credential and
//! classify what came back.

use async_trait::async_trait;
use salvage_core::TokenUsage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Generation parameters for one provider attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderRequest {
    /// Model identifier.
    pub model: String,
    /// User prompt.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion size cap.
    pub max_tokens: u32,
}

/// The provider's reply to one attempt.
#[derive(Debug, Clone)]
pub struct ProviderReply {
    /// The completion text.
    pub content: String,
    /// Token usage, when reported.
    pub usage: TokenUsage,
}

/// Classified failure of a single attempt.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// HTTP 429. Not terminal: the gateway sleeps and retries.
    #[error("rate limited{}", retry_after_suffix(.retry_after))]
    RateLimited {
        /// Value of the `retry-after` header, when present and parseable.
        retry_after: Option<Duration>,
    },
    /// Timeout or connection failure. Retried with fixed backoff.
    #[error("network failure{}: {message}", timeout_suffix(.timeout))]
    Network {
        /// Description of the failure.
        message: String,
        /// Whether the failure was a timeout.
        timeout: bool,
    },
    /// Any other HTTP error status. Never retried.
    #[error("provider returned status {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },
    /// A 2xx response whose body did not contain a completion.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

fn retry_after_suffix(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {}s)", d.as_secs()),
        None => String::new(),
    }
}

fn timeout_suffix(timeout: &bool) -> &'static str {
    if *timeout {
        " (timeout)"
    } else {
        ""
    }
}

impl TransportError {
    /// Whether the gateway may retry after this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network { .. })
    }
}

/// One provider attempt with one credential.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Send the request, authenticating with `credential`.
    async fn send(
        &self,
        request: &ProviderRequest,
        credential: &str,
    ) -> Result<ProviderReply, TransportError>;
}

// ============================================================================
// HTTP transport (OpenAI-compatible chat completions)
// ============================================================================

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponseBody {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: Option<u64>,
    #[serde(default)]
    completion_tokens: Option<u64>,
    #[serde(default)]
    total_tokens: Option<u64>,
}

/// Production transport: an HTTPS chat-completion call via reqwest.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport against an OpenAI-compatible base URL.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &ProviderRequest,
        credential: &str,
    ) -> Result<ProviderReply, TransportError> {
        let body = ChatRequestBody {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(credential)
            .json(&body)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<f64>().ok())
                .map(Duration::from_secs_f64);
            return Err(TransportError::RateLimited { retry_after });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponseBody = response
            .json()
            .await
            .map_err(|e| TransportError::Malformed(e.to_string()))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::Malformed("response has no choices".to_string()))?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(ProviderReply {
            content: choice.message.content,
            usage,
        })
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    TransportError::Network {
        message: err.to_string(),
        timeout: err.is_timeout(),
    }
}

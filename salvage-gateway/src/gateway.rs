//! The gateway: retry loop, credential rotation, and backoff.

use crate::credentials::CredentialPool;
use crate::error::GatewayError;
use crate::transport::{HttpTransport, ProviderRequest, Transport, TransportError};
use salvage_core::{CompletionRequest, CompletionResult, ConfigError, SalvageConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Sleep applied to a 429 response that carries no `retry-after` header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(10);

/// An owned, injectable gateway over one provider endpoint.
///
/// The gateway holds the credential pool and its rotation cursor, so every
/// caller sharing a `Gateway` (including the self-heal loop, which must reuse
/// the instance that served the initial call) rotates through the same pool
/// and observes the same rate-limit backoff.
#[derive(Debug, Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
    pool: Arc<CredentialPool>,
    backoff: Duration,
    default_model: String,
}

impl Gateway {
    /// Build a gateway over an arbitrary transport.
    pub fn new(
        transport: Arc<dyn Transport>,
        pool: CredentialPool,
        backoff: Duration,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            pool: Arc::new(pool),
            backoff,
            default_model: default_model.into(),
        }
    }

    /// Build the production HTTP gateway from configuration.
    pub fn from_config(config: &SalvageConfig) -> Result<Self, ConfigError> {
        let pool = CredentialPool::new(config.credentials.clone())?;
        let transport = HttpTransport::new(config.base_url.clone(), config.timeout);
        Ok(Self::new(
            Arc::new(transport),
            pool,
            config.backoff,
            config.default_model.clone(),
        ))
    }

    /// The model used when a request does not name one.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Pool size, for callers that care about rotation breadth.
    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    /// Issue a completion call with default generation parameters.
    pub async fn call(
        &self,
        prompt: &str,
        model: &str,
        max_attempts: u32,
    ) -> Result<CompletionResult, GatewayError> {
        let request = ProviderRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            temperature: salvage_core::request::DEFAULT_TEMPERATURE,
            max_tokens: salvage_core::request::DEFAULT_MAX_TOKENS,
        };
        self.run_attempts(&request, max_attempts).await
    }

    /// Issue a completion call for a full [`CompletionRequest`].
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResult, GatewayError> {
        let wire = ProviderRequest {
            model: request
                .model()
                .unwrap_or(&self.default_model)
                .to_string(),
            prompt: request.prompt().to_string(),
            temperature: request.temperature(),
            max_tokens: request.max_tokens(),
        };
        self.run_attempts(&wire, request.max_attempts()).await
    }

    async fn run_attempts(
        &self,
        request: &ProviderRequest,
        max_attempts: u32,
    ) -> Result<CompletionResult, GatewayError> {
        let max_attempts = max_attempts.max(1);
        let started = Instant::now();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            // Each attempt, not each logical request, advances the cursor.
            let (index, credential) = self.pool.next();
            info!(
                attempt,
                max_attempts,
                credential_index = index,
                credential_suffix = credential.suffix(),
                model = %request.model,
                "issuing provider attempt"
            );

            match self.transport.send(request, credential.expose()).await {
                Ok(reply) => {
                    info!(
                        attempt,
                        credential_index = index,
                        content_len = reply.content.len(),
                        "provider attempt succeeded"
                    );
                    return Ok(CompletionResult::new(
                        reply.content,
                        reply.usage,
                        started.elapsed(),
                    ));
                }
                Err(TransportError::RateLimited { retry_after }) => {
                    let wait = retry_after.unwrap_or(DEFAULT_RETRY_AFTER);
                    warn!(
                        attempt,
                        credential_index = index,
                        wait_secs = wait.as_secs_f64(),
                        "rate limited, sleeping before retry"
                    );
                    last_error = TransportError::RateLimited { retry_after }.to_string();
                    if attempt < max_attempts {
                        tokio::time::sleep(wait).await;
                    }
                }
                Err(err @ TransportError::Network { .. }) => {
                    warn!(
                        attempt,
                        credential_index = index,
                        error = %err,
                        "transient network failure"
                    );
                    last_error = err.to_string();
                    if attempt < max_attempts {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
                Err(TransportError::Http { status, body }) => {
                    warn!(attempt, credential_index = index, status, "fatal provider status");
                    return Err(GatewayError::Fatal {
                        status: Some(status),
                        message: format!("status {status}: {body}"),
                    });
                }
                Err(TransportError::Malformed(message)) => {
                    warn!(attempt, credential_index = index, "malformed provider response");
                    return Err(GatewayError::Fatal {
                        status: None,
                        message,
                    });
                }
            }
        }

        Err(GatewayError::Transient {
            attempts: max_attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::transport::ProviderReply;
    use salvage_core::{SchemaId, TokenUsage};

    fn pool(n: usize) -> CredentialPool {
        let keys = (1..=n).map(|i| format!("key-number-{i:04}")).collect();
        CredentialPool::new(keys).unwrap()
    }

    fn gateway(transport: MockTransport, n: usize) -> (Gateway, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let gw = Gateway::new(
            transport.clone(),
            pool(n),
            Duration::from_millis(1),
            "mock-model",
        );
        (gw, transport)
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let (gw, transport) = gateway(
            MockTransport::new().with_reply(ProviderReply {
                content: "hello".into(),
                usage: TokenUsage::with_tokens(10, 2),
            }),
            1,
        );
        let result = gw.call("p", "m", 3).await.unwrap();
        assert_eq!(result.text, "hello");
        assert_eq!(result.usage.total_tokens, Some(12));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_retries_then_succeeds() {
        let (gw, transport) = gateway(
            MockTransport::new()
                .with_error(TransportError::RateLimited {
                    retry_after: Some(Duration::from_millis(1)),
                })
                .with_error(TransportError::RateLimited {
                    retry_after: Some(Duration::from_millis(1)),
                })
                .with_text("ok"),
            2,
        );
        let result = gw.call("p", "m", 3).await.unwrap();
        assert_eq!(result.text, "ok");
        assert_eq!(transport.call_count(), 3);
        // Pool of two means the retries rotated onto a different credential.
        let suffixes: Vec<String> = transport
            .recorded()
            .iter()
            .map(|call| call.credential_suffix.clone())
            .collect();
        assert!(suffixes.windows(2).any(|w| w[0] != w[1]));
    }

    #[tokio::test]
    async fn test_network_failures_exhaust_to_transient() {
        let (gw, transport) = gateway(
            MockTransport::new()
                .with_error(TransportError::Network {
                    message: "connection refused".into(),
                    timeout: false,
                })
                .with_error(TransportError::Network {
                    message: "timed out".into(),
                    timeout: true,
                }),
            1,
        );
        let err = gw.call("p", "m", 2).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_http_error_is_fatal_immediately() {
        let (gw, transport) = gateway(
            MockTransport::new()
                .with_error(TransportError::Http {
                    status: 401,
                    body: "bad key".into(),
                })
                .with_text("never reached"),
            3,
        );
        let err = gw.call("p", "m", 3).await.unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_non_ascii_credential_attempt_succeeds() {
        let transport = Arc::new(MockTransport::new().with_text("ok"));
        let pool = CredentialPool::new(vec!["ключ-доступа".into()]).unwrap();
        let gw = Gateway::new(transport.clone(), pool, Duration::from_millis(1), "m");
        let result = gw.call("p", "m", 3).await.unwrap();
        assert_eq!(result.text, "ok");
        assert_eq!(transport.recorded()[0].credential_suffix, "тупа");
    }

    #[tokio::test]
    async fn test_complete_resolves_default_model() {
        let (gw, transport) = gateway(MockTransport::new().with_text("{}"), 1);
        let request = CompletionRequest::new("prompt", SchemaId::IdeaPitch);
        gw.complete(&request).await.unwrap();
        assert_eq!(transport.recorded()[0].model, "mock-model");
    }
}

#[cfg(test)]
mod http_tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn http_gateway(base_url: &str, keys: Vec<String>) -> Gateway {
        let pool = CredentialPool::new(keys).unwrap();
        let transport = HttpTransport::new(base_url, Duration::from_secs(5));
        Gateway::new(Arc::new(transport), pool, Duration::from_millis(1), "m")
    }

    #[tokio::test]
    async fn test_rate_limited_twice_then_succeeds_over_http() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "{\"title\": \"A\"}"}}],
                "usage": {"prompt_tokens": 20, "completion_tokens": 8, "total_tokens": 28}
            })))
            .mount(&server)
            .await;

        let gateway = http_gateway(&server.uri(), vec!["key-one-aaaa".into(), "key-two-bbbb".into()]);
        let result = gateway.call("generate", "test-model", 3).await.unwrap();

        assert_eq!(result.text, "{\"title\": \"A\"}");
        assert_eq!(result.usage.total_tokens, Some(28));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
        // With a pool of two, at least one retry carried a different bearer key.
        let auths: Vec<&str> = requests
            .iter()
            .filter_map(|r| r.headers.get("authorization"))
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert!(auths.windows(2).any(|w| w[0] != w[1]));
    }

    #[tokio::test]
    async fn test_server_error_is_fatal_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let gateway = http_gateway(&server.uri(), vec!["key-one-aaaa".into()]);
        let err = gateway.call("generate", "test-model", 3).await.unwrap_err();
        assert!(matches!(err, GatewayError::Fatal { status: Some(500), .. }));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }
}

//! Gateway error taxonomy.

use thiserror::Error;

/// Terminal outcome of a gateway call that did not produce a completion.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Timeouts, connection failures, or rate limiting persisted through the
    /// whole attempt budget.
    #[error("provider unavailable after {attempts} attempts: {last_error}")]
    Transient {
        /// Attempts consumed.
        attempts: u32,
        /// The last classified failure.
        last_error: String,
    },
    /// A non-retryable provider failure: any HTTP error other than 429, or a
    /// well-formed response with no completion in it.
    #[error("fatal provider failure: {message}")]
    Fatal {
        /// HTTP status, when the failure was an error status.
        status: Option<u16>,
        /// Description of the failure.
        message: String,
    },
}

impl GatewayError {
    /// Whether a later, separate logical request might succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

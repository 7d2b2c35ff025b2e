//! Environment-driven configuration.
//!
//! Credentials are discovered by naming convention: every `SALVAGE_API_KEY_<N>`
//! variable contributes one pool entry, ordered numerically. Zero credentials
//! is a startup error; nothing else fails fast.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Prefix for credential environment variables.
pub const CREDENTIAL_ENV_PREFIX: &str = "SALVAGE_API_KEY_";

/// Default model identifier when `SALVAGE_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "moonshotai/kimi-k2-instruct";

/// Default per-call network timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default fixed backoff between transient-failure retries.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(3);

/// Default self-heal retry budget.
pub const DEFAULT_HEAL_RETRIES: u32 = 2;

/// Configuration errors. These are the only errors that fail fast, before any
/// provider attempt is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `SALVAGE_API_KEY_<N>` variables were found.
    #[error("no provider credentials configured: set at least {CREDENTIAL_ENV_PREFIX}1")]
    NoCredentials,
    /// A numeric setting could not be parsed.
    #[error("invalid value for {name}: {value}")]
    InvalidSetting {
        /// Variable name.
        name: &'static str,
        /// The offending value.
        value: String,
    },
}

/// Pipeline-wide configuration, normally loaded from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalvageConfig {
    /// Ordered provider credentials.
    pub credentials: Vec<String>,
    /// Default model identifier.
    pub default_model: String,
    /// Base URL of the OpenAI-compatible completion endpoint.
    pub base_url: String,
    /// Per-call network timeout.
    pub timeout: Duration,
    /// Gateway attempt budget per logical request.
    pub max_attempts: u32,
    /// Fixed backoff between transient-failure retries.
    pub backoff: Duration,
    /// Maximum self-heal provider calls after a validation failure.
    pub max_heal_retries: u32,
}

impl SalvageConfig {
    /// Build a config from explicit credentials and defaults for the rest.
    pub fn new(credentials: Vec<String>) -> Result<Self, ConfigError> {
        if credentials.is_empty() {
            return Err(ConfigError::NoCredentials);
        }
        Ok(Self {
            credentials,
            default_model: DEFAULT_MODEL.to_string(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_attempts: 3,
            backoff: DEFAULT_BACKOFF,
            max_heal_retries: DEFAULT_HEAL_RETRIES,
        })
    }

    /// Load configuration from the environment.
    ///
    /// Recognized variables: `SALVAGE_API_KEY_<N>` (required, at least one),
    /// `SALVAGE_MODEL`, `SALVAGE_BASE_URL`, `SALVAGE_TIMEOUT_SECS`,
    /// `SALVAGE_MAX_ATTEMPTS`, `SALVAGE_BACKOFF_SECS`,
    /// `SALVAGE_HEAL_RETRIES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials = credentials_from_env(std::env::vars());
        let mut config = Self::new(credentials)?;

        if let Ok(model) = std::env::var("SALVAGE_MODEL") {
            config.default_model = model;
        }
        if let Ok(url) = std::env::var("SALVAGE_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(value) = std::env::var("SALVAGE_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(parse_setting("SALVAGE_TIMEOUT_SECS", &value)?);
        }
        if let Ok(value) = std::env::var("SALVAGE_MAX_ATTEMPTS") {
            config.max_attempts = parse_setting::<u32>("SALVAGE_MAX_ATTEMPTS", &value)?.max(1);
        }
        if let Ok(value) = std::env::var("SALVAGE_BACKOFF_SECS") {
            config.backoff = Duration::from_secs(parse_setting("SALVAGE_BACKOFF_SECS", &value)?);
        }
        if let Ok(value) = std::env::var("SALVAGE_HEAL_RETRIES") {
            config.max_heal_retries = parse_setting("SALVAGE_HEAL_RETRIES", &value)?;
        }
        Ok(config)
    }
}

fn parse_setting<T: std::str::FromStr>(
    name: &'static str,
    value: &str,
) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidSetting {
        name,
        value: value.to_string(),
    })
}

/// Collect credentials from an environment snapshot, sorted by their numeric
/// suffix. Non-numeric suffixes sort after numeric ones, alphabetically.
fn credentials_from_env(vars: impl Iterator<Item = (String, String)>) -> Vec<String> {
    let mut keyed: Vec<(String, String)> = vars
        .filter(|(k, v)| k.starts_with(CREDENTIAL_ENV_PREFIX) && !v.is_empty())
        .collect();
    keyed.sort_by(|(a, _), (b, _)| {
        let na = suffix_number(a);
        let nb = suffix_number(b);
        match (na, nb) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    });
    keyed.into_iter().map(|(_, v)| v).collect()
}

fn suffix_number(name: &str) -> Option<u32> {
    name.rsplit('_').next()?.parse().ok()
}

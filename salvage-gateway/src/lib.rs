//! # salvage-gateway
//!
//! The provider gateway: the only part of the pipeline that touches the
//! network. It owns a pool of interchangeable credentials, rotates them
//! round-robin on every attempt, honors `retry-after` on HTTP 429, applies a
//! fixed backoff to transient transport failures, and surfaces everything
//! else immediately as a fatal error.
//!
//! The HTTP wire format is the OpenAI-compatible chat completion shape:
//! `{model, messages, temperature, max_tokens}` out, a body with
//! `choices[0].message.content` back.
//!
//! ## Example
//!
//! ```rust,no_run
//! use salvage_core::SalvageConfig;
//! use salvage_gateway::Gateway;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = SalvageConfig::from_env()?;
//! let gateway = Gateway::from_config(&config)?;
//! let result = gateway.call("Summarize this repo", &config.default_model, 3).await?;
//! println!("{}", result.text);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod credentials;
pub mod error;
pub mod gateway;
pub mod mock;
pub mod transport;

pub use credentials::{Credential, CredentialPool};
pub use error::GatewayError;
pub use gateway::Gateway;
pub use mock::MockTransport;
pub use transport::{HttpTransport, ProviderReply, ProviderRequest, Transport, TransportError};

//! Client-side OAuth 2.0 grant flows with token lifecycle management.
//!
//! Obtains, validates, refreshes, and revokes access tokens across the
//! RFC 6749 grant types: authorization code, client credentials,
//! resource-owner password, refresh token, and extension grants.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ FlowRegistry │  grant-type name → configured GrantFlow
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐      ┌────────────────┐      ┌────────────────┐
//! │  GrantFlow   │─────►│ TokenExchanger │─────►│  AccessToken   │
//! │ build request│      │ POST + classify│      │ expiry/refresh/│
//! └──────────────┘      └───────┬────────┘      │ revoke         │
//!                               │               └────────────────┘
//!                               ▼
//!                        TokenTransport (reqwest, or a test double)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use oauth2_flows::{GrantFlow, OAuth2Config, Params, TokenExchanger, TokenTypeHint};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(
//!         OAuth2Config::new("https://auth.example.com", "my_client_id")
//!             .with_client_secret("my_client_secret"),
//!     );
//!
//!     // Exchange resource-owner credentials for a token
//!     let exchanger = TokenExchanger::new();
//!     let flow = GrantFlow::password(Arc::clone(&config));
//!
//!     let mut params = Params::new();
//!     params.insert("username".to_string(), "alice".to_string());
//!     params.insert("password".to_string(), "correct horse".to_string());
//!
//!     let token = exchanger.fetch(&flow, &params).await?;
//!     println!("Authorization: {}", token.authorization_header().await?);
//!
//!     // Refresh when the lifetime runs out (lazy check, no timers)
//!     if token.expires_within(300).await {
//!         token.refresh().await?;
//!     }
//!
//!     // Done with it — revoke server-side and invalidate locally
//!     token.revoke(TokenTypeHint::AccessToken).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`config`]: immutable provider configuration ([`OAuth2Config`])
//! - [`flow`]: grant-type variants and request building ([`GrantFlow`])
//! - [`exchange`]: token endpoint calls ([`TokenExchanger`])
//! - [`token`]: record + lifecycle entity ([`TokenRecord`], [`AccessToken`])
//! - [`registry`]: grant-type name lookup ([`FlowRegistry`])
//! - [`transport`]: the single outbound call seam ([`TokenTransport`])
//! - [`error`]: the crate-wide error taxonomy ([`OAuth2Error`])
//!
//! # What this crate does not do
//!
//! It never retries (retry policy belongs to the transport or the caller),
//! never runs background expiry timers (expiry is computed on demand), and
//! never performs GET — `authorize_url` produces a URL for the caller to
//! redirect a user-agent to.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod config;
pub mod error;
pub mod exchange;
pub mod flow;
pub mod registry;
pub mod token;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use config::{ClientAuth, OAuth2Config, RequestFormat};
pub use error::OAuth2Error;
pub use exchange::TokenExchanger;
pub use flow::{GrantFlow, GrantRequest, GrantType, Params};
pub use registry::FlowRegistry;
pub use token::{AccessToken, TokenRecord, TokenTypeHint};
pub use transport::{HttpTransport, TokenTransport, TransportRequest, TransportResponse};

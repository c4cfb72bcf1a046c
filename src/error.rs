//! Error types for OAuth 2.0 grant flows
//!
//! One taxonomy for the whole crate so callers can distinguish "my input was
//! wrong" (`Validation`) from "the network failed" (`Transport`, `Canceled`)
//! from "the server rejected the grant" (`Server`).

use thiserror::Error;

use crate::flow::GrantType;

/// Error type for OAuth 2.0 client operations
#[derive(Debug, Error)]
pub enum OAuth2Error {
    /// Caller-supplied parameters are missing or invalid.
    ///
    /// Raised before anything is sent over the wire.
    #[error("invalid grant parameters: {0}")]
    Validation(String),

    /// `authorize_url` was called on a non-interactive flow.
    #[error("grant type `{0}` has no authorization endpoint (non-interactive flow)")]
    NotInteractive(GrantType),

    /// Network or HTTP-level failure with no OAuth 2.0 error body.
    ///
    /// `status` is present when the server responded at all, absent for
    /// connection-level failures.
    #[error("transport failure{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport {
        /// HTTP status code, if a response was received
        status: Option<u16>,
        /// Underlying failure description
        message: String,
    },

    /// The caller-supplied deadline elapsed before the transport completed.
    ///
    /// No token record is installed when this is returned.
    #[error("request canceled before completion")]
    Canceled,

    /// The server returned 2xx but the body violated the token response
    /// contract (not JSON, empty `access_token`, negative `expires_in`).
    #[error("malformed token response: {0}")]
    InvalidResponse(String),

    /// The authorization server rejected the grant (RFC 6749 §5.2).
    #[error("authorization server rejected the grant: {code}{}", .description.as_ref().map(|d| format!(": {d}")).unwrap_or_default())]
    Server {
        /// OAuth 2.0 error code (e.g. `invalid_grant`)
        code: String,
        /// Optional human-readable `error_description`
        description: Option<String>,
    },

    /// `refresh` was called but the server never issued a refresh token.
    #[error("no refresh token available")]
    NoRefreshToken,

    /// The access token was revoked; no further use is possible.
    #[error("access token has been revoked")]
    TokenRevoked,

    /// Lookup of a grant type that was not configured in the registry.
    #[error("grant type `{0}` is not configured")]
    UnknownFlow(String),
}

impl OAuth2Error {
    /// True when the failure came from the network layer rather than from
    /// this client or the authorization server.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Canceled)
    }
}

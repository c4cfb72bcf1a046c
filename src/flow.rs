//! Grant flow variants and token request construction
//!
//! One closed set of grant types implementing a single contract:
//! - `authorize_url` for the interactive authorization-code flow
//! - `build_request` to assemble the form parameters for a token exchange
//!
//! Each flow captures its provider configuration at construction and holds
//! no per-exchange state; every call is independent.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::{ClientAuth, OAuth2Config};
use crate::error::OAuth2Error;

/// Caller-supplied parameters for `build_request` / `authorize_url`
///
/// Unknown keys pass through to the wire unchanged, which keeps extension
/// grants forward-compatible. A caller-supplied `grant_type` is never
/// honored.
pub type Params = BTreeMap<String, String>;

/// OAuth 2.0 grant type tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GrantType {
    /// Interactive browser-redirect flow (RFC 6749 §4.1)
    AuthorizationCode,
    /// Machine-to-machine flow (RFC 6749 §4.4)
    ClientCredentials,
    /// Resource-owner password flow (RFC 6749 §4.3)
    Password,
    /// Exchange a refresh token for a new access token (RFC 6749 §6)
    RefreshToken,
    /// Extension grant identified by its own URN (RFC 6749 §4.5)
    Extension(String),
}

impl GrantType {
    /// The `grant_type` literal sent on the wire
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
            Self::Extension(urn) => urn,
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token request parameters assembled by a [`GrantFlow`]
///
/// Only `GrantFlow::build_request` produces these, so a `GrantRequest`
/// always carries the correct `grant_type` and the configured client
/// credentials. Serializes transparently as a flat string map for form or
/// JSON encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GrantRequest {
    params: BTreeMap<String, String>,
}

impl GrantRequest {
    /// Look up a parameter value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// True when no parameters are present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Consume the request, yielding the wire parameter map
    #[must_use]
    pub fn into_params(self) -> BTreeMap<String, String> {
        self.params
    }
}

/// One configured grant flow
///
/// The polymorphic contract of the crate: every variant builds token
/// requests the same way and only the authorization-code variant is
/// interactive.
#[derive(Debug, Clone)]
pub struct GrantFlow {
    grant_type: GrantType,
    config: Arc<OAuth2Config>,
}

impl GrantFlow {
    /// Create a flow for an arbitrary grant type
    #[must_use]
    pub fn new(grant_type: GrantType, config: Arc<OAuth2Config>) -> Self {
        Self { grant_type, config }
    }

    /// Authorization-code flow
    #[must_use]
    pub fn authorization_code(config: Arc<OAuth2Config>) -> Self {
        Self::new(GrantType::AuthorizationCode, config)
    }

    /// Client-credentials flow
    #[must_use]
    pub fn client_credentials(config: Arc<OAuth2Config>) -> Self {
        Self::new(GrantType::ClientCredentials, config)
    }

    /// Resource-owner password flow
    #[must_use]
    pub fn password(config: Arc<OAuth2Config>) -> Self {
        Self::new(GrantType::Password, config)
    }

    /// Refresh-token flow
    #[must_use]
    pub fn refresh_token(config: Arc<OAuth2Config>) -> Self {
        Self::new(GrantType::RefreshToken, config)
    }

    /// Extension grant with its own `grant_type` URN
    #[must_use]
    pub fn extension(urn: impl Into<String>, config: Arc<OAuth2Config>) -> Self {
        Self::new(GrantType::Extension(urn.into()), config)
    }

    /// The grant type this flow negotiates
    #[must_use]
    pub fn grant_type(&self) -> &GrantType {
        &self.grant_type
    }

    /// The provider configuration captured at construction
    #[must_use]
    pub fn config(&self) -> &Arc<OAuth2Config> {
        &self.config
    }

    /// Build the browser-redirect URL for interactive authorization
    ///
    /// Only the authorization-code flow is interactive; every other variant
    /// fails with [`OAuth2Error::NotInteractive`] so callers cannot mistake
    /// a machine flow for a browser flow.
    ///
    /// # Arguments
    /// * `params` - Must contain `redirect_uri`; `scope`, `state`, and any
    ///   extra parameters are appended when present
    ///
    /// # Errors
    /// Returns [`OAuth2Error::NotInteractive`] for non-interactive variants
    /// and [`OAuth2Error::Validation`] when `redirect_uri` is missing.
    pub fn authorize_url(&self, params: &Params) -> Result<String, OAuth2Error> {
        if self.grant_type != GrantType::AuthorizationCode {
            return Err(OAuth2Error::NotInteractive(self.grant_type.clone()));
        }

        let redirect_uri = require(params, "redirect_uri")?;

        let mut query = vec![
            ("response_type".to_string(), "code".to_string()),
            ("client_id".to_string(), self.config.client_id.clone()),
            ("redirect_uri".to_string(), redirect_uri.to_string()),
        ];

        if let Some(scope) = non_empty(params, "scope") {
            query.push(("scope".to_string(), scope.to_string()));
        }
        if let Some(state) = non_empty(params, "state") {
            query.push(("state".to_string(), state.to_string()));
        }

        // Extras pass through unchanged, after the standard parameters.
        for (key, value) in params {
            if !matches!(key.as_str(), "redirect_uri" | "scope" | "state" | "response_type") {
                query.push((key.clone(), value.clone()));
            }
        }

        let query_string = query
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        Ok(format!("{}?{}", self.config.authorization_url(), query_string))
    }

    /// Build the token request for this grant type
    ///
    /// Validates the variant's required fields, injects the `grant_type`
    /// literal (a caller-supplied `grant_type` is overwritten, never
    /// honored), injects client credentials per the configured auth style,
    /// and passes every other caller parameter through unchanged.
    ///
    /// # Errors
    /// Returns [`OAuth2Error::Validation`] when a required field is missing
    /// or empty.
    pub fn build_request(&self, params: &Params) -> Result<GrantRequest, OAuth2Error> {
        match &self.grant_type {
            GrantType::Password => {
                require(params, "username")?;
                require(params, "password")?;
            }
            GrantType::AuthorizationCode => {
                require(params, "code")?;
            }
            GrantType::RefreshToken => {
                require(params, "refresh_token")?;
            }
            GrantType::ClientCredentials | GrantType::Extension(_) => {}
        }

        let mut request = params.clone();
        request.insert("grant_type".to_string(), self.grant_type.as_str().to_string());
        request.insert("client_id".to_string(), self.config.client_id.clone());

        if self.config.client_auth == ClientAuth::Body {
            if let Some(secret) = &self.config.client_secret {
                request.insert("client_secret".to_string(), secret.clone());
            }
        }

        debug!(grant_type = %self.grant_type, params = request.len(), "built token request");

        Ok(GrantRequest { params: request })
    }
}

fn require<'a>(params: &'a Params, key: &str) -> Result<&'a str, OAuth2Error> {
    match params.get(key).map(String::as_str) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(OAuth2Error::Validation(format!("missing required parameter `{key}`"))),
    }
}

fn non_empty<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

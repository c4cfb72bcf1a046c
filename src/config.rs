//! OAuth 2.0 provider configuration
//!
//! Immutable configuration for one authorization server. Captured once at
//! flow construction (behind an `Arc`) and never re-read per request, so
//! there is no hidden global mutable state.

/// How the client proves its identity to the token endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientAuth {
    /// `client_id`/`client_secret` travel in the request body (RFC 6749 §2.3.1)
    #[default]
    Body,
    /// Credentials travel in an HTTP Basic `Authorization` header
    BasicHeader,
}

/// Body encoding for token endpoint requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestFormat {
    /// `application/x-www-form-urlencoded` (the RFC 6749 default)
    #[default]
    Form,
    /// `application/json`, for servers that accept it
    Json,
}

/// Configuration for one OAuth 2.0 authorization server
///
/// Endpoint paths default to the common `/oauth/*` layout; override them
/// for providers with different URL patterns.
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// Authorization server base URL (e.g. `https://accounts.example.com`)
    pub site: String,

    /// OAuth client ID
    pub client_id: String,

    /// OAuth client secret; absent for public clients
    pub client_secret: Option<String>,

    /// Path of the interactive authorization endpoint
    pub authorize_path: String,

    /// Path of the token endpoint
    pub token_path: String,

    /// Path of the token revocation endpoint (RFC 7009)
    pub revocation_path: String,

    /// Where client credentials are placed on token requests
    pub client_auth: ClientAuth,

    /// Body encoding for token requests
    pub request_format: RequestFormat,
}

impl OAuth2Config {
    /// Create a configuration with default endpoint paths
    ///
    /// # Arguments
    /// * `site` - Authorization server base URL, without a trailing slash
    /// * `client_id` - Registered OAuth client ID
    #[must_use]
    pub fn new(site: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            client_id: client_id.into(),
            client_secret: None,
            authorize_path: "/oauth/authorize".to_string(),
            token_path: "/oauth/token".to_string(),
            revocation_path: "/oauth/revoke".to_string(),
            client_auth: ClientAuth::Body,
            request_format: RequestFormat::Form,
        }
    }

    /// Set the client secret (confidential clients)
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Override the authorization endpoint path
    #[must_use]
    pub fn with_authorize_path(mut self, path: impl Into<String>) -> Self {
        self.authorize_path = path.into();
        self
    }

    /// Override the token endpoint path
    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<String>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Override the revocation endpoint path
    #[must_use]
    pub fn with_revocation_path(mut self, path: impl Into<String>) -> Self {
        self.revocation_path = path.into();
        self
    }

    /// Send client credentials in an HTTP Basic header instead of the body
    #[must_use]
    pub fn with_client_auth(mut self, auth: ClientAuth) -> Self {
        self.client_auth = auth;
        self
    }

    /// Encode token request bodies as JSON instead of form data
    #[must_use]
    pub fn with_request_format(mut self, format: RequestFormat) -> Self {
        self.request_format = format;
        self
    }

    /// Full URL of the interactive authorization endpoint
    #[must_use]
    pub fn authorization_url(&self) -> String {
        format!("{}{}", self.site, self.authorize_path)
    }

    /// Full URL of the token endpoint
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}{}", self.site, self.token_path)
    }

    /// Full URL of the revocation endpoint
    #[must_use]
    pub fn revocation_url(&self) -> String {
        format!("{}{}", self.site, self.revocation_path)
    }
}

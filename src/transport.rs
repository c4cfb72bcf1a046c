//! Transport seam for token endpoint calls
//!
//! The crate performs exactly one kind of outbound call: a POST with a flat
//! parameter body that yields a status code and a body. [`TokenTransport`]
//! abstracts that call so tests can substitute a scripted transport, and
//! [`HttpTransport`] is the reqwest-backed implementation used in
//! production. Retry policy lives behind this seam, never above it.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;

use crate::config::RequestFormat;
use crate::error::OAuth2Error;

/// One outbound POST to an authorization server endpoint
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Absolute endpoint URL
    pub url: String,
    /// HTTP Basic credentials, when the config authenticates via header
    pub basic_auth: Option<(String, String)>,
    /// Body encoding
    pub format: RequestFormat,
    /// Flat parameter body
    pub body: BTreeMap<String, String>,
    /// Caller-supplied deadline; the call fails with
    /// [`OAuth2Error::Canceled`] when it elapses
    pub deadline: Option<Duration>,
}

/// Raw response from an authorization server endpoint
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: String,
}

impl TransportResponse {
    /// True for any 2xx status
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for the single outbound call shape of this crate
///
/// Implementations must deliver exactly one completion per call, success or
/// failure, and must honor `request.deadline`.
#[async_trait]
pub trait TokenTransport: Send + Sync + fmt::Debug {
    /// Execute the POST and return the raw status and body
    ///
    /// # Errors
    /// Returns [`OAuth2Error::Transport`] for connection-level failures and
    /// [`OAuth2Error::Canceled`] when the deadline elapses. HTTP error
    /// statuses are *not* errors at this layer; classification happens in
    /// the exchanger.
    async fn post(&self, request: TransportRequest) -> Result<TransportResponse, OAuth2Error>;
}

/// Production transport backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a 30 second overall request timeout
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    /// Create a transport from a caller-configured reqwest client
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenTransport for HttpTransport {
    async fn post(&self, request: TransportRequest) -> Result<TransportResponse, OAuth2Error> {
        let mut builder = self.client.post(&request.url).header(ACCEPT, "application/json");

        if let Some((user, password)) = &request.basic_auth {
            builder = builder.basic_auth(user, Some(password));
        }

        builder = match request.format {
            RequestFormat::Form => builder.form(&request.body),
            RequestFormat::Json => builder.json(&request.body),
        };

        let send = async {
            let response = builder.send().await.map_err(from_reqwest)?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(from_reqwest)?;
            Ok(TransportResponse { status, body })
        };

        match request.deadline {
            Some(deadline) => tokio::time::timeout(deadline, send)
                .await
                .map_err(|_| OAuth2Error::Canceled)?,
            None => send.await,
        }
    }
}

fn from_reqwest(err: reqwest::Error) -> OAuth2Error {
    OAuth2Error::Transport {
        status: err.status().map(|s| s.as_u16()),
        message: err.to_string(),
    }
}

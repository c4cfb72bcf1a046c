//! Token exchange against the authorization server
//!
//! [`TokenExchanger`] drives a [`GrantFlow`]: it serializes the built
//! request, performs the single POST through the transport seam, and
//! classifies the outcome — a parsed [`TokenRecord`] on 2xx, a `Server`
//! error when the body carries an RFC 6749 error object, and a `Transport`
//! error with the raw status otherwise. Stateless across invocations; no
//! retries at this layer.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{ClientAuth, OAuth2Config};
use crate::error::OAuth2Error;
use crate::flow::{GrantFlow, Params};
use crate::token::{AccessToken, ErrorResponse, TokenRecord, TokenTypeHint};
use crate::transport::{HttpTransport, TokenTransport, TransportRequest, TransportResponse};

/// Executes token exchanges for any grant flow
///
/// Cheap to clone — the transport sits behind an `Arc` — so every
/// [`AccessToken`] it produces keeps a handle for later refreshes.
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    transport: Arc<dyn TokenTransport>,
}

impl TokenExchanger {
    /// Create an exchanger backed by the production HTTP transport
    #[must_use]
    pub fn new() -> Self {
        Self { transport: Arc::new(HttpTransport::new()) }
    }

    /// Create an exchanger with a caller-supplied transport
    #[must_use]
    pub fn with_transport(transport: Arc<dyn TokenTransport>) -> Self {
        Self { transport }
    }

    /// Exchange a grant for an [`AccessToken`]
    ///
    /// # Arguments
    /// * `flow` - The grant flow to negotiate
    /// * `params` - Caller parameters for the flow (see
    ///   [`GrantFlow::build_request`])
    ///
    /// # Errors
    /// Returns [`OAuth2Error::Validation`] for bad parameters,
    /// [`OAuth2Error::Server`] when the authorization server rejects the
    /// grant, and [`OAuth2Error::Transport`] for network or non-OAuth HTTP
    /// failures.
    pub async fn fetch(
        &self,
        flow: &GrantFlow,
        params: &Params,
    ) -> Result<AccessToken, OAuth2Error> {
        let record = self.exchange_inner(flow, params, None).await?;
        Ok(AccessToken::new(self.clone(), Arc::clone(flow.config()), record))
    }

    /// [`fetch`](Self::fetch) with a deadline passed through to the
    /// transport
    ///
    /// # Errors
    /// Additionally returns [`OAuth2Error::Canceled`] when the deadline
    /// elapses before the exchange completes.
    pub async fn fetch_with_deadline(
        &self,
        flow: &GrantFlow,
        params: &Params,
        deadline: Duration,
    ) -> Result<AccessToken, OAuth2Error> {
        let record = self.exchange_inner(flow, params, Some(deadline)).await?;
        Ok(AccessToken::new(self.clone(), Arc::clone(flow.config()), record))
    }

    /// Raw exchange yielding the parsed record; used by [`AccessToken`]
    /// for refreshes.
    pub(crate) async fn exchange(
        &self,
        flow: &GrantFlow,
        params: &Params,
        deadline: Option<Duration>,
    ) -> Result<TokenRecord, OAuth2Error> {
        self.exchange_inner(flow, params, deadline).await
    }

    async fn exchange_inner(
        &self,
        flow: &GrantFlow,
        params: &Params,
        deadline: Option<Duration>,
    ) -> Result<TokenRecord, OAuth2Error> {
        let request = flow.build_request(params)?;
        let config = flow.config();

        debug!(grant_type = %flow.grant_type(), url = %config.token_url(), "token exchange");

        let response = self
            .transport
            .post(TransportRequest {
                url: config.token_url(),
                basic_auth: basic_auth_for(config),
                format: config.request_format,
                body: request.into_params(),
                deadline,
            })
            .await?;

        if !response.is_success() {
            return Err(classify_rejection(response));
        }

        let record = TokenRecord::from_response_body(&response.body)?;
        info!(
            grant_type = %flow.grant_type(),
            expires_in = ?record.expires_in,
            "token exchange succeeded"
        );
        Ok(record)
    }

    /// Revoke a credential at the configured revocation endpoint (RFC 7009)
    pub(crate) async fn revoke(
        &self,
        config: &OAuth2Config,
        token: &str,
        hint: TokenTypeHint,
    ) -> Result<(), OAuth2Error> {
        let mut body = BTreeMap::new();
        body.insert("token".to_string(), token.to_string());
        body.insert("token_type_hint".to_string(), hint.as_str().to_string());
        body.insert("client_id".to_string(), config.client_id.clone());
        if config.client_auth == ClientAuth::Body {
            if let Some(secret) = &config.client_secret {
                body.insert("client_secret".to_string(), secret.clone());
            }
        }

        let response = self
            .transport
            .post(TransportRequest {
                url: config.revocation_url(),
                basic_auth: basic_auth_for(config),
                format: config.request_format,
                body,
                deadline: None,
            })
            .await?;

        if response.is_success() {
            Ok(())
        } else {
            Err(classify_rejection(response))
        }
    }
}

impl Default for TokenExchanger {
    fn default() -> Self {
        Self::new()
    }
}

fn basic_auth_for(config: &OAuth2Config) -> Option<(String, String)> {
    (config.client_auth == ClientAuth::BasicHeader).then(|| {
        (config.client_id.clone(), config.client_secret.clone().unwrap_or_default())
    })
}

/// Map a non-2xx response to `Server` when it carries an OAuth 2.0 error
/// object, `Transport` with the raw status otherwise.
fn classify_rejection(response: TransportResponse) -> OAuth2Error {
    match serde_json::from_str::<ErrorResponse>(&response.body) {
        Ok(err) => OAuth2Error::Server { code: err.error, description: err.error_description },
        Err(_) => OAuth2Error::Transport {
            status: Some(response.status),
            message: response.body,
        },
    }
}

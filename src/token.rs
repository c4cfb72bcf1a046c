//! Token records and the access token lifecycle
//!
//! A [`TokenRecord`] is the immutable result of one successful exchange.
//! [`AccessToken`] wraps the current record and drives the lifecycle:
//! expiry is computed lazily from `issued_at + expires_in` (never a
//! background timer), refresh swaps in a new record atomically with
//! concurrent calls coalescing into one network call, and revocation is a
//! terminal transition that zeroizes the record locally even when the
//! server is unreachable.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::config::OAuth2Config;
use crate::error::OAuth2Error;
use crate::exchange::TokenExchanger;
use crate::flow::GrantFlow;

/// Wire-level token endpoint success response (RFC 6749 §5.1)
///
/// Additional members beyond the registered ones are captured verbatim in
/// `claims` for downstream consumers.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    token_type: Option<String>,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    #[serde(flatten)]
    claims: Map<String, Value>,
}

/// Wire-level token endpoint error response (RFC 6749 §5.2)
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}

/// Immutable result of one successful token exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Opaque credential presented to resource servers; never empty
    pub access_token: String,

    /// Refresh token, when the server issued one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token type, `"Bearer"` when the server omits it
    pub token_type: String,

    /// Lifetime in seconds; `None` means non-expiring or opaque
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    /// Receipt timestamp, stamped locally since servers may omit it
    pub issued_at: DateTime<Utc>,

    /// Additional response members, preserved verbatim
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub claims: Map<String, Value>,
}

impl TokenRecord {
    /// Parse a 2xx token endpoint body, stamping `issued_at` with the
    /// current time
    ///
    /// # Errors
    /// Returns [`OAuth2Error::InvalidResponse`] when the body is not a JSON
    /// token response, `access_token` is empty, or `expires_in` is negative.
    pub(crate) fn from_response_body(body: &str) -> Result<Self, OAuth2Error> {
        let response: TokenResponse = serde_json::from_str(body)
            .map_err(|e| OAuth2Error::InvalidResponse(e.to_string()))?;

        if response.access_token.is_empty() {
            return Err(OAuth2Error::InvalidResponse("empty access_token".to_string()));
        }
        if matches!(response.expires_in, Some(seconds) if seconds < 0) {
            return Err(OAuth2Error::InvalidResponse("negative expires_in".to_string()));
        }

        Ok(Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_in: response.expires_in,
            issued_at: Utc::now(),
            claims: response.claims,
        })
    }

    /// Absolute expiration timestamp, or `None` for non-expiring tokens
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in.map(|seconds| self.issued_at + ChronoDuration::seconds(seconds))
    }

    /// True once `issued_at + expires_in` has passed
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_within(0)
    }

    /// True when the token is expired or expires within the threshold
    ///
    /// Tokens without an expiry are never considered expired.
    #[must_use]
    pub fn expires_within(&self, threshold_seconds: i64) -> bool {
        match self.expires_at() {
            Some(expires_at) => Utc::now() + ChronoDuration::seconds(threshold_seconds) >= expires_at,
            None => false,
        }
    }

    /// Seconds until expiry, or `None` when no expiry is set
    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.expires_at().map(|at| (at - Utc::now()).num_seconds())
    }

    /// `Authorization` header value, e.g. `Bearer <token>`
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// Overwrite credential material so nothing stale stays resident
    fn scrub(&mut self) {
        self.access_token.zeroize();
        if let Some(refresh) = self.refresh_token.as_mut() {
            refresh.zeroize();
        }
        self.refresh_token = None;
        self.claims.clear();
    }
}

/// Which credential a revocation request targets (RFC 7009 §2.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenTypeHint {
    /// Revoke the access token
    AccessToken,
    /// Revoke the refresh token
    RefreshToken,
}

impl TokenTypeHint {
    /// The `token_type_hint` literal sent on the wire
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }
}

#[derive(Debug)]
enum TokenState {
    Active { record: TokenRecord, generation: u64 },
    Revoked,
}

/// Live access token with refresh and revocation
///
/// Owns exactly one [`TokenRecord`] at a time; replacement on refresh is an
/// atomic swap under a write lock, never a partial mutation. Not `Clone` —
/// share an instance via `Arc` instead, so no two tokens ever share
/// mutable state by accident.
#[derive(Debug)]
pub struct AccessToken {
    exchanger: TokenExchanger,
    config: Arc<OAuth2Config>,
    state: RwLock<TokenState>,
    // Single in-flight refresh guard; the state lock is never held across
    // a network call.
    refresh_gate: Mutex<()>,
}

impl AccessToken {
    pub(crate) fn new(
        exchanger: TokenExchanger,
        config: Arc<OAuth2Config>,
        record: TokenRecord,
    ) -> Self {
        Self {
            exchanger,
            config,
            state: RwLock::new(TokenState::Active { record, generation: 0 }),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Snapshot of the current token record
    ///
    /// # Errors
    /// Returns [`OAuth2Error::TokenRevoked`] after revocation.
    pub async fn record(&self) -> Result<TokenRecord, OAuth2Error> {
        match &*self.state.read().await {
            TokenState::Active { record, .. } => Ok(record.clone()),
            TokenState::Revoked => Err(OAuth2Error::TokenRevoked),
        }
    }

    /// Current access token string
    ///
    /// # Errors
    /// Returns [`OAuth2Error::TokenRevoked`] after revocation.
    pub async fn access_token(&self) -> Result<String, OAuth2Error> {
        Ok(self.record().await?.access_token)
    }

    /// `Authorization` header value for the current record
    ///
    /// # Errors
    /// Returns [`OAuth2Error::TokenRevoked`] after revocation.
    pub async fn authorization_header(&self) -> Result<String, OAuth2Error> {
        Ok(self.record().await?.authorization_header())
    }

    /// True once the current record's lifetime has elapsed
    ///
    /// Computed lazily against the wall clock on every call; a revoked
    /// token always reports expired since it can never be presented again.
    pub async fn is_expired(&self) -> bool {
        self.expires_within(0).await
    }

    /// True when the current record is expired or expires within the
    /// threshold
    pub async fn expires_within(&self, threshold_seconds: i64) -> bool {
        match &*self.state.read().await {
            TokenState::Active { record, .. } => record.expires_within(threshold_seconds),
            TokenState::Revoked => true,
        }
    }

    /// Seconds until expiry, or `None` when revoked or non-expiring
    pub async fn seconds_until_expiry(&self) -> Option<i64> {
        match &*self.state.read().await {
            TokenState::Active { record, .. } => record.seconds_until_expiry(),
            TokenState::Revoked => None,
        }
    }

    /// True after `revoke` has completed
    pub async fn is_revoked(&self) -> bool {
        matches!(&*self.state.read().await, TokenState::Revoked)
    }

    /// Obtain a fresh record via the refresh-token grant
    ///
    /// Concurrent calls coalesce: overlapping callers perform exactly one
    /// network call and all observe the resulting record. When the server
    /// omits `refresh_token` in its response, the previous refresh token is
    /// carried forward.
    ///
    /// # Errors
    /// Returns [`OAuth2Error::NoRefreshToken`] when the server never issued
    /// a refresh token (the current record is left untouched),
    /// [`OAuth2Error::TokenRevoked`] after revocation, and any exchange
    /// error otherwise — in which case no new record is installed.
    pub async fn refresh(&self) -> Result<TokenRecord, OAuth2Error> {
        self.refresh_inner(None).await
    }

    /// [`refresh`](Self::refresh) with a deadline passed through to the
    /// transport
    ///
    /// # Errors
    /// Additionally returns [`OAuth2Error::Canceled`] when the deadline
    /// elapses; the current record is left in place.
    pub async fn refresh_with_deadline(
        &self,
        deadline: std::time::Duration,
    ) -> Result<TokenRecord, OAuth2Error> {
        self.refresh_inner(Some(deadline)).await
    }

    async fn refresh_inner(
        &self,
        deadline: Option<std::time::Duration>,
    ) -> Result<TokenRecord, OAuth2Error> {
        let (refresh_token, seen_generation) = match &*self.state.read().await {
            TokenState::Active { record, generation } => {
                let token =
                    record.refresh_token.clone().ok_or(OAuth2Error::NoRefreshToken)?;
                (token, *generation)
            }
            TokenState::Revoked => return Err(OAuth2Error::TokenRevoked),
        };

        let _gate = self.refresh_gate.lock().await;

        // Coalesce: a refresh that completed while we waited on the gate
        // already produced the record we came for.
        match &*self.state.read().await {
            TokenState::Active { record, generation } if *generation != seen_generation => {
                debug!("refresh coalesced with an in-flight call");
                return Ok(record.clone());
            }
            TokenState::Revoked => return Err(OAuth2Error::TokenRevoked),
            TokenState::Active { .. } => {}
        }

        let flow = GrantFlow::refresh_token(Arc::clone(&self.config));
        let mut params = BTreeMap::new();
        params.insert("refresh_token".to_string(), refresh_token.clone());

        let mut new_record = self.exchanger.exchange(&flow, &params, deadline).await?;

        // Servers are not required to reissue the refresh token.
        if new_record.refresh_token.is_none() {
            new_record.refresh_token = Some(refresh_token);
        }

        let mut state = self.state.write().await;
        match &mut *state {
            TokenState::Active { record, generation } => {
                *record = new_record.clone();
                *generation += 1;
            }
            TokenState::Revoked => return Err(OAuth2Error::TokenRevoked),
        }
        drop(state);

        info!(expires_in = ?new_record.expires_in, "access token refreshed");

        Ok(new_record)
    }

    /// Revoke the token at the server and terminally invalidate it locally
    ///
    /// The local transition to revoked happens *regardless* of the server
    /// response: the security intent — stop using this credential — must
    /// hold even when the server is unreachable. The record is zeroized so
    /// no stale credential stays resident.
    ///
    /// # Errors
    /// Returns [`OAuth2Error::TokenRevoked`] when already revoked. A
    /// transport or server failure is reported to the caller, but the
    /// local state is revoked by the time this returns.
    pub async fn revoke(&self, hint: TokenTypeHint) -> Result<(), OAuth2Error> {
        let token = match &*self.state.read().await {
            TokenState::Active { record, .. } => match hint {
                TokenTypeHint::AccessToken => record.access_token.clone(),
                TokenTypeHint::RefreshToken => {
                    record.refresh_token.clone().ok_or(OAuth2Error::NoRefreshToken)?
                }
            },
            TokenState::Revoked => return Err(OAuth2Error::TokenRevoked),
        };

        let result = self.exchanger.revoke(&self.config, &token, hint).await;

        let mut state = self.state.write().await;
        if let TokenState::Active { record, .. } = &mut *state {
            record.scrub();
        }
        *state = TokenState::Revoked;
        drop(state);

        if let Err(err) = &result {
            warn!(error = %err, "revocation request failed; token revoked locally anyway");
        } else {
            info!(hint = hint.as_str(), "token revoked");
        }

        result
    }
}

//! Integration tests for the OAuth 2.0 grant flows
//!
//! Exercises the full exchange path against a wiremock authorization
//! server: grant negotiation, error classification, refresh coalescing,
//! revocation, and deadline cancellation.

use std::sync::Arc;
use std::time::Duration;

use oauth2_flows::{
    ClientAuth, FlowRegistry, GrantFlow, GrantType, OAuth2Config, OAuth2Error, Params,
    TokenExchanger, TokenTypeHint,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Arc<OAuth2Config> {
    Arc::new(
        OAuth2Config::new(server.uri(), "test_client_id").with_client_secret("test_secret"),
    )
}

fn password_params() -> Params {
    let mut params = Params::new();
    params.insert("username".to_string(), "alice".to_string());
    params.insert("password".to_string(), "correct horse".to_string());
    params
}

/// Validates the full password-grant exchange against a mock server.
///
/// # Test Steps
/// 1. Mount a token endpoint that requires the injected `grant_type` and
///    the client credentials in the form body
/// 2. Fetch a token through the password flow
/// 3. Verify the resulting record: access token, bearer type, live expiry,
///    and preserved additional claims
#[tokio::test(flavor = "multi_thread")]
async fn test_password_grant_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=alice"))
        .and(body_string_contains("client_id=test_client_id"))
        .and(body_string_contains("client_secret=test_secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at_live",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "rt_live",
            "id_token": "jwt_claims"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let exchanger = TokenExchanger::new();
    let flow = GrantFlow::password(config_for(&server));

    let token = exchanger.fetch(&flow, &password_params()).await.expect("exchange failed");

    let record = token.record().await.unwrap();
    assert_eq!(record.access_token, "at_live");
    assert_eq!(record.token_type, "Bearer");
    assert_eq!(record.claims.get("id_token"), Some(&json!("jwt_claims")));
    assert!(!token.is_expired().await);
    assert_eq!(token.authorization_header().await.unwrap(), "Bearer at_live");
}

/// Validates that an RFC 6749 error body maps to a `Server` error.
///
/// # Test Steps
/// 1. Mount a token endpoint answering HTTP 400 with
///    `{"error": "invalid_grant"}`
/// 2. Attempt an exchange
/// 3. Verify the failure is `Server { code: "invalid_grant" }`, not a
///    generic transport error
#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_grant_maps_to_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "authorization code expired"
        })))
        .mount(&server)
        .await;

    let exchanger = TokenExchanger::new();
    let flow = GrantFlow::password(config_for(&server));

    match exchanger.fetch(&flow, &password_params()).await {
        Err(OAuth2Error::Server { code, description }) => {
            assert_eq!(code, "invalid_grant");
            assert_eq!(description.as_deref(), Some("authorization code expired"));
        }
        other => panic!("expected Server error, got {other:?}"),
    }
}

/// Validates that concurrent refreshes coalesce into one network call.
///
/// # Test Steps
/// 1. Mount the token endpoint: one password exchange, then exactly one
///    refresh-token exchange with artificial latency
/// 2. Fetch a token, then spawn eight concurrent `refresh()` calls
/// 3. Verify every caller observes the refreshed record and the refresh
///    mock was hit exactly once (checked on server verification)
#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_refresh_single_network_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at_initial",
            "expires_in": 1,
            "refresh_token": "rt_initial"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt_initial"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(200))
                .set_body_json(json!({
                    "access_token": "at_refreshed",
                    "expires_in": 3600
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let exchanger = TokenExchanger::new();
    let flow = GrantFlow::password(config_for(&server));
    let token = Arc::new(exchanger.fetch(&flow, &password_params()).await.unwrap());

    let mut handles = vec![];
    for _ in 0..8 {
        let token = Arc::clone(&token);
        handles.push(tokio::spawn(async move { token.refresh().await }));
    }

    for handle in handles {
        let record = handle.await.unwrap().expect("refresh failed");
        assert_eq!(record.access_token, "at_refreshed");
        // The server omitted refresh_token; the old one is carried forward.
        assert_eq!(record.refresh_token.as_deref(), Some("rt_initial"));
    }

    assert_eq!(token.access_token().await.unwrap(), "at_refreshed");
}

/// Validates revocation when the server does not answer usefully.
///
/// # Test Steps
/// 1. Mount only the token endpoint; the revocation endpoint answers 404
/// 2. Fetch a token and revoke it
/// 3. Verify the failure is reported but the local state is revoked and
///    every subsequent operation fails with `TokenRevoked`
#[tokio::test(flavor = "multi_thread")]
async fn test_revoke_survives_server_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at_1",
            "expires_in": 3600,
            "refresh_token": "rt_1"
        })))
        .mount(&server)
        .await;

    let exchanger = TokenExchanger::new();
    let flow = GrantFlow::password(config_for(&server));
    let token = exchanger.fetch(&flow, &password_params()).await.unwrap();

    let result = token.revoke(TokenTypeHint::AccessToken).await;
    assert!(result.is_err(), "revocation endpoint failure must be reported");

    assert!(token.is_revoked().await);
    assert!(matches!(token.access_token().await, Err(OAuth2Error::TokenRevoked)));
    assert!(matches!(token.refresh().await, Err(OAuth2Error::TokenRevoked)));
}

/// Validates successful revocation through the revocation endpoint.
///
/// # Test Steps
/// 1. Mount token and revocation endpoints; the revocation mock requires
///    the token and the type hint in the body
/// 2. Fetch and revoke
/// 3. Verify success and the terminal state
#[tokio::test(flavor = "multi_thread")]
async fn test_revoke_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at_1",
            "refresh_token": "rt_1"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth/revoke"))
        .and(body_string_contains("token=rt_1"))
        .and(body_string_contains("token_type_hint=refresh_token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let exchanger = TokenExchanger::new();
    let flow = GrantFlow::password(config_for(&server));
    let token = exchanger.fetch(&flow, &password_params()).await.unwrap();

    token.revoke(TokenTypeHint::RefreshToken).await.expect("revocation failed");
    assert!(token.is_revoked().await);
}

/// Validates deadline cancellation: no record is installed when the
/// transport is cut off.
///
/// # Test Steps
/// 1. Mount a token endpoint with 500 ms latency
/// 2. Fetch with a 50 ms deadline
/// 3. Verify the call fails with `Canceled`
#[tokio::test(flavor = "multi_thread")]
async fn test_deadline_cancellation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_json(json!({"access_token": "at_slow"})),
        )
        .mount(&server)
        .await;

    let exchanger = TokenExchanger::new();
    let flow = GrantFlow::client_credentials(config_for(&server));

    let result =
        exchanger.fetch_with_deadline(&flow, &Params::new(), Duration::from_millis(50)).await;
    assert!(matches!(result, Err(OAuth2Error::Canceled)));
}

/// Validates Basic-header client authentication on the wire.
///
/// # Test Steps
/// 1. Configure `ClientAuth::BasicHeader` and mount a token endpoint
///    requiring an `Authorization` header
/// 2. Exchange client credentials
/// 3. Verify the body carries no `client_secret`
#[tokio::test(flavor = "multi_thread")]
async fn test_basic_header_client_auth() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header_exists("authorization"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at_m2m",
            "expires_in": 600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = Arc::new(
        OAuth2Config::new(server.uri(), "test_client_id")
            .with_client_secret("test_secret")
            .with_client_auth(ClientAuth::BasicHeader),
    );

    let exchanger = TokenExchanger::new();
    let flow = GrantFlow::client_credentials(config);

    let token = exchanger.fetch(&flow, &Params::new()).await.expect("exchange failed");
    assert_eq!(token.access_token().await.unwrap(), "at_m2m");

    // Secret must not leak into the body when using the header.
    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(!body.contains("client_secret"));
}

/// Validates registry-driven flow selection end to end.
///
/// # Test Steps
/// 1. Build a registry with password and refresh-token flows
/// 2. Resolve `password` by name and exchange through it
/// 3. Verify an unconfigured name fails with `UnknownFlow`
#[tokio::test(flavor = "multi_thread")]
async fn test_registry_driven_exchange() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at_reg",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let registry = FlowRegistry::from_config(
        config_for(&server),
        [GrantType::Password, GrantType::RefreshToken],
    );

    let flow = registry.get("password").expect("password flow configured");
    let token = TokenExchanger::new().fetch(flow, &password_params()).await.unwrap();
    assert_eq!(token.access_token().await.unwrap(), "at_reg");

    assert!(matches!(
        registry.get("client_credentials"),
        Err(OAuth2Error::UnknownFlow(_))
    ));
}

/// Validates the interactive authorization URL contract.
///
/// # Test Steps
/// 1. Build the authorize URL from the authorization-code flow
/// 2. Verify `response_type=code`, client ID, and encoded redirect URI
/// 3. Verify non-interactive flows refuse the operation
#[tokio::test(flavor = "multi_thread")]
async fn test_authorize_url_contract() {
    let config = Arc::new(OAuth2Config::new("https://auth.example.com", "test_client_id"));

    let mut params = Params::new();
    params.insert("redirect_uri".to_string(), "http://localhost:8888/callback".to_string());
    params.insert("scope".to_string(), "openid".to_string());
    params.insert("state".to_string(), "s123".to_string());

    let url = GrantFlow::authorization_code(Arc::clone(&config)).authorize_url(&params).unwrap();
    assert!(url.contains("response_type=code"));
    assert!(url.contains("client_id=test_client_id"));
    assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8888%2Fcallback"));

    let machine = GrantFlow::client_credentials(config);
    assert!(matches!(
        machine.authorize_url(&params),
        Err(OAuth2Error::NotInteractive(_))
    ));
}

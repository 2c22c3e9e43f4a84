//! End-to-end tests of the auth and session API
//!
//! Each test starts its own in-memory server on an ephemeral port.
//!
//! Run with: cargo test -p integration-tests --test api_tests

use std::time::Duration;

use hydra_client::{ClientError, RefreshError};
use hydra_service::SessionService;
use integration_tests::{
    assert_data, assert_envelope, assert_error, fixtures::*, TestServer, API,
};
use reqwest::StatusCode;
use serde_json::json;

async fn register(server: &TestServer) -> (RegisterRequest, AuthData) {
    let request = RegisterRequest::unique();
    let response = server
        .post(&format!("{API}/auth/register"), &request)
        .await
        .unwrap();
    let auth = assert_data(response, StatusCode::CREATED).await.unwrap();
    (request, auth)
}

async fn login(server: &TestServer, request: &LoginRequest) -> AuthData {
    let response = server
        .post(&format!("{API}/auth/login"), request)
        .await
        .unwrap();
    assert_data(response, StatusCode::OK).await.unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.unwrap();
    let response = server.get("/health").await.unwrap();
    let body = assert_envelope(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_readiness() {
    let server = TestServer::start().await.unwrap();
    let response = server.get("/health/ready").await.unwrap();
    let body = assert_envelope(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["checks"]["database"], "memory");
    assert_eq!(body["checks"]["cache"], "memory");
}

// ============================================================================
// Registration and login
// ============================================================================

#[tokio::test]
async fn test_register_user() {
    let server = TestServer::start().await.unwrap();
    let (request, auth) = register(&server).await;

    assert_eq!(auth.user.email, request.email);
    assert_eq!(auth.user.name, request.name);
    assert!(!auth.user.email_verified);
    assert_eq!(auth.token_type, "Bearer");
    assert!(!auth.access_token.is_empty());
    assert!(!auth.refresh_token.is_empty());
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let server = TestServer::start().await.unwrap();
    let (request, _) = register(&server).await;

    let mut again = request.clone();
    again.email = request.email.to_uppercase();
    let response = server
        .post(&format!("{API}/auth/register"), &again)
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::CONFLICT).await.unwrap();
    assert_eq!(code, "CONFLICT");
}

#[tokio::test]
async fn test_register_validation_error() {
    let server = TestServer::start().await.unwrap();
    let response = server
        .post(
            &format!("{API}/auth/register"),
            &json!({"email": "not-an-email", "password": "short", "name": ""}),
        )
        .await
        .unwrap();
    let envelope = assert_envelope(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(envelope["success"], false);
    assert_eq!(envelope["error"]["code"], "VALIDATION_ERROR");
}

/// Scenario A
#[tokio::test]
async fn test_login_returns_verifiable_tokens() {
    let server = TestServer::start().await.unwrap();
    let (request, registered) = register(&server).await;

    let auth = login(&server, &LoginRequest::from_register(&request)).await;
    assert_eq!(auth.user.id, registered.user.id);
    assert!(auth.expires_at > chrono::Utc::now());
    assert_eq!(auth.expires_in, 900);

    let claims = server
        .context
        .token_issuer()
        .verify_access_token(&auth.access_token)
        .unwrap();
    assert_eq!(claims.user_id().unwrap(), registered.user.id);

    let session = SessionService::new(&server.context)
        .validate_session(&auth.session_token)
        .await
        .unwrap()
        .expect("session token resolves to a live session");
    assert_eq!(session.user_id, registered.user.id);
    assert_eq!(session.expires_at.timestamp(), auth.expires_at.timestamp());
}

#[tokio::test]
async fn test_login_failures_look_alike() {
    let server = TestServer::start().await.unwrap();
    let (request, _) = register(&server).await;

    let mut wrong_password = LoginRequest::from_register(&request);
    wrong_password.password = "Wrong1234".to_string();
    let response = server
        .post(&format!("{API}/auth/login"), &wrong_password)
        .await
        .unwrap();
    let wrong = assert_envelope(response, StatusCode::UNAUTHORIZED).await.unwrap();

    let mut unknown = LoginRequest::from_register(&request);
    unknown.email = "nobody@example.com".to_string();
    let response = server
        .post(&format!("{API}/auth/login"), &unknown)
        .await
        .unwrap();
    let missing = assert_envelope(response, StatusCode::UNAUTHORIZED).await.unwrap();

    assert_eq!(wrong["error"]["code"], "INVALID_CREDENTIALS");
    assert_eq!(wrong["error"], missing["error"]);
}

// ============================================================================
// Bearer authentication
// ============================================================================

#[tokio::test]
async fn test_me() {
    let server = TestServer::start().await.unwrap();
    let (request, auth) = register(&server).await;

    let response = server
        .get_auth(&format!("{API}/auth/me"), &auth.access_token)
        .await
        .unwrap();
    let me: UserData = assert_data(response, StatusCode::OK).await.unwrap();
    assert_eq!(me.email, request.email);
}

#[tokio::test]
async fn test_missing_and_malformed_tokens() {
    let server = TestServer::start().await.unwrap();
    let (_, auth) = register(&server).await;

    let response = server.get(&format!("{API}/auth/me")).await.unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "MISSING_AUTH");

    let response = server
        .get_auth(&format!("{API}/auth/me"), "not.a.jwt")
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_TOKEN");

    // a refresh token is not an access token
    let response = server
        .get_auth(&format!("{API}/auth/me"), &auth.refresh_token)
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_TOKEN");
}

// ============================================================================
// Refresh and logout
// ============================================================================

#[tokio::test]
async fn test_refresh_keeps_refresh_token() {
    let server = TestServer::start().await.unwrap();
    let (_, auth) = register(&server).await;

    let response = server
        .post(
            &format!("{API}/auth/refresh"),
            &json!({"refreshToken": auth.refresh_token}),
        )
        .await
        .unwrap();
    let refreshed: RefreshData = assert_data(response, StatusCode::OK).await.unwrap();
    assert_eq!(refreshed.refresh_token, auth.refresh_token);
    assert_eq!(refreshed.expires_in, 900);
    assert_eq!(refreshed.expires_at, auth.expires_at);

    let response = server
        .get_auth(&format!("{API}/auth/me"), &refreshed.access_token)
        .await
        .unwrap();
    assert_envelope(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let server = TestServer::start().await.unwrap();
    let (_, auth) = register(&server).await;

    let response = server
        .post(
            &format!("{API}/auth/refresh"),
            &json!({"refreshToken": auth.access_token}),
        )
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_TOKEN");
}

#[tokio::test]
async fn test_logout_revokes_current_session() {
    let server = TestServer::start().await.unwrap();
    let (request, auth) = register(&server).await;
    let other = login(&server, &LoginRequest::from_register(&request).on_device("web")).await;

    let response = server
        .post_auth(&format!("{API}/auth/logout"), &auth.access_token, &json!({}))
        .await
        .unwrap();
    let logout: LogoutData = assert_data(response, StatusCode::OK).await.unwrap();
    assert_eq!(logout.sessions_revoked, 1);

    let response = server
        .get_auth(&format!("{API}/auth/me"), &auth.access_token)
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_SESSION");

    // no resurrection through refresh
    let response = server
        .post(
            &format!("{API}/auth/refresh"),
            &json!({"refreshToken": auth.refresh_token}),
        )
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_SESSION");

    // the other device is untouched
    let response = server
        .get_auth(&format!("{API}/auth/me"), &other.access_token)
        .await
        .unwrap();
    assert_envelope(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_revoked_session_rejected_after_cached_hit() {
    let server = TestServer::start().await.unwrap();
    let (_, auth) = register(&server).await;

    let response = server
        .get_auth(&format!("{API}/auth/me"), &auth.access_token)
        .await
        .unwrap();
    assert_envelope(response, StatusCode::OK).await.unwrap();

    let session_id = server
        .context
        .session_cache()
        .get(&auth.session_token)
        .await
        .unwrap()
        .expect("authenticated session is cached")
        .id;
    assert!(server
        .context
        .session_cache()
        .get_by_id(session_id)
        .await
        .unwrap()
        .is_some());

    let response = server
        .post_auth(&format!("{API}/auth/logout"), &auth.access_token, &json!({}))
        .await
        .unwrap();
    assert_envelope(response, StatusCode::OK).await.unwrap();
    assert!(server
        .context
        .session_cache()
        .get_by_id(session_id)
        .await
        .unwrap()
        .is_none());

    let response = server
        .get_auth(&format!("{API}/auth/me"), &auth.access_token)
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_SESSION");
}

#[tokio::test]
async fn test_logout_body_is_optional_but_must_parse() {
    let server = TestServer::start().await.unwrap();
    let (request, auth) = register(&server).await;
    let other = login(&server, &LoginRequest::from_register(&request).on_device("web")).await;

    let response = server
        .post_auth_raw(
            &format!("{API}/auth/logout"),
            &auth.access_token,
            r#"{"logoutAllDevices": tru"#,
        )
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "INVALID_BODY");

    // nothing was revoked
    for token in [&auth.access_token, &other.access_token] {
        let response = server
            .get_auth(&format!("{API}/auth/me"), token)
            .await
            .unwrap();
        assert_envelope(response, StatusCode::OK).await.unwrap();
    }

    let response = server
        .post_auth_raw(&format!("{API}/auth/logout"), &auth.access_token, "")
        .await
        .unwrap();
    let logout: LogoutData = assert_data(response, StatusCode::OK).await.unwrap();
    assert_eq!(logout.sessions_revoked, 1);

    let response = server
        .get_auth(&format!("{API}/auth/me"), &other.access_token)
        .await
        .unwrap();
    assert_envelope(response, StatusCode::OK).await.unwrap();
}

/// Scenario C
#[tokio::test]
async fn test_logout_all_devices() {
    let server = TestServer::start().await.unwrap();
    let (request, device1) = register(&server).await;
    let device2 = login(&server, &LoginRequest::from_register(&request).on_device("ios")).await;

    let response = server
        .post_auth(
            &format!("{API}/auth/logout"),
            &device1.access_token,
            &json!({"logoutAllDevices": true}),
        )
        .await
        .unwrap();
    let logout: LogoutData = assert_data(response, StatusCode::OK).await.unwrap();
    assert_eq!(logout.sessions_revoked, 2);

    let response = server
        .get_auth(&format!("{API}/auth/me"), &device2.access_token)
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_SESSION");

    let response = server
        .post(
            &format!("{API}/auth/refresh"),
            &json!({"refreshToken": device2.refresh_token}),
        )
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_SESSION");
}

#[tokio::test]
async fn test_list_sessions_marks_current() {
    let server = TestServer::start().await.unwrap();
    let (request, auth) = register(&server).await;
    login(&server, &LoginRequest::from_register(&request).on_device("android")).await;

    let response = server
        .get_auth(&format!("{API}/auth/sessions"), &auth.access_token)
        .await
        .unwrap();
    let sessions: Vec<SessionData> = assert_data(response, StatusCode::OK).await.unwrap();

    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions.iter().filter(|s| s.current).count(), 1);
    assert!(sessions
        .iter()
        .any(|s| !s.current && s.device_info["platform"] == "android"));
    assert!(sessions
        .iter()
        .all(|s| s.ip_address.as_deref() == Some("127.0.0.1")));
}

// ============================================================================
// Account flows
// ============================================================================

#[tokio::test]
async fn test_change_password_signs_out_everywhere() {
    let server = TestServer::start().await.unwrap();
    let (request, auth) = register(&server).await;

    let response = server
        .post_auth(
            &format!("{API}/auth/password/change"),
            &auth.access_token,
            &json!({"currentPassword": TEST_PASSWORD, "newPassword": "Refill4567"}),
        )
        .await
        .unwrap();
    let envelope = assert_envelope(response, StatusCode::OK).await.unwrap();
    assert_eq!(envelope["success"], true);

    let response = server
        .get_auth(&format!("{API}/auth/me"), &auth.access_token)
        .await
        .unwrap();
    assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();

    let response = server
        .post(
            &format!("{API}/auth/login"),
            &LoginRequest::from_register(&request),
        )
        .await
        .unwrap();
    assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();

    let mut fresh = LoginRequest::from_register(&request);
    fresh.password = "Refill4567".to_string();
    login(&server, &fresh).await;
}

#[tokio::test]
async fn test_password_reset_flow() {
    let server = TestServer::start().await.unwrap();
    let (request, auth) = register(&server).await;

    let response = server
        .post(
            &format!("{API}/auth/password/forgot"),
            &json!({"email": request.email}),
        )
        .await
        .unwrap();
    assert_envelope(response, StatusCode::OK).await.unwrap();

    // unknown addresses get the same answer
    let response = server
        .post(
            &format!("{API}/auth/password/forgot"),
            &json!({"email": "nobody@example.com"}),
        )
        .await
        .unwrap();
    assert_envelope(response, StatusCode::OK).await.unwrap();

    let token = server
        .notifier
        .last_reset_token(auth.user.id)
        .expect("reset token sent");

    let response = server
        .post(
            &format!("{API}/auth/password/reset"),
            &json!({"token": token, "newPassword": "Refill4567"}),
        )
        .await
        .unwrap();
    assert_envelope(response, StatusCode::OK).await.unwrap();

    let response = server
        .get_auth(&format!("{API}/auth/me"), &auth.access_token)
        .await
        .unwrap();
    assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();

    let mut fresh = LoginRequest::from_register(&request);
    fresh.password = "Refill4567".to_string();
    login(&server, &fresh).await;
}

#[tokio::test]
async fn test_verify_email() {
    let server = TestServer::start().await.unwrap();
    let (_, auth) = register(&server).await;

    let token = server
        .notifier
        .last_verification_token(auth.user.id)
        .expect("verification token sent");

    let response = server
        .post(&format!("{API}/auth/email/verify"), &json!({"token": token}))
        .await
        .unwrap();
    let user: UserData = assert_data(response, StatusCode::OK).await.unwrap();
    assert!(user.email_verified);

    let response = server
        .post(
            &format!("{API}/auth/email/verify"),
            &json!({"token": auth.access_token}),
        )
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_TOKEN");
}

#[tokio::test]
async fn test_delete_account() {
    let server = TestServer::start().await.unwrap();
    let (request, auth) = register(&server).await;

    let response = server
        .delete_auth(
            &format!("{API}/auth/account"),
            &auth.access_token,
            &json!({"password": TEST_PASSWORD}),
        )
        .await
        .unwrap();
    assert_envelope(response, StatusCode::OK).await.unwrap();

    let response = server
        .get_auth(&format!("{API}/auth/me"), &auth.access_token)
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_SESSION");

    let response = server
        .post(
            &format!("{API}/auth/login"),
            &LoginRequest::from_register(&request),
        )
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_CREDENTIALS");
}

// ============================================================================
// Client gateway against the live server
// ============================================================================

/// Scenario B
#[tokio::test]
async fn test_gateway_refreshes_expired_access_token() {
    let server = TestServer::start_with(&[("JWT_ACCESS_TOKEN_EXPIRY", "1")])
        .await
        .unwrap();
    let (request, _) = register(&server).await;
    let (gateway, transport) = server.gateway();

    let login = gateway
        .login(&request.email, &request.password, false)
        .await
        .unwrap();
    assert_eq!(login.expires_in, 1);
    assert!(!login.session_token.is_empty());
    assert!(chrono::DateTime::parse_from_rfc3339(&login.expires_at).is_ok());

    tokio::time::sleep(Duration::from_millis(2100)).await;

    let me: UserData = gateway.get_json("/auth/me").await.unwrap();
    assert_eq!(me.email, request.email);
    assert_eq!(transport.unauthorized(), 1);
    assert_eq!(transport.refresh_calls(), 1);

    let stored = gateway.storage().access_token().await.unwrap();
    assert_ne!(stored, login.access_token);
    assert_eq!(
        gateway.storage().refresh_token().await.as_deref(),
        Some(login.refresh_token.as_str())
    );
}

/// Scenario D
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_gateway_concurrent_401s_refresh_once() {
    let server = TestServer::start_with(&[("JWT_ACCESS_TOKEN_EXPIRY", "1")])
        .await
        .unwrap();
    const K: usize = 5;
    let (request, _) = register(&server).await;
    let (gateway, transport) = server.gated_gateway();
    gateway
        .login(&request.email, &request.password, false)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2100)).await;

    let handles: Vec<_> = (0..K)
        .map(|_| {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.get_json::<UserData>("/auth/me").await })
        })
        .collect();

    // all K requests saw a 401 and are parked behind the one refresh
    tokio::time::timeout(Duration::from_secs(5), async {
        while gateway.coordinator().waiting() < K - 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("requests should queue behind the refresh");

    assert_eq!(transport.refresh_calls(), 1);
    assert_eq!(transport.unauthorized(), K);
    assert!(handles.iter().all(|h| !h.is_finished()));

    transport.open_gate();
    for handle in handles {
        let me = handle.await.unwrap().unwrap();
        assert_eq!(me.email, request.email);
    }
    assert_eq!(transport.refresh_calls(), 1);
    assert!(!gateway.coordinator().in_flight());
}

#[tokio::test]
async fn test_gateway_gives_up_after_logout_all() {
    let server = TestServer::start().await.unwrap();
    let (request, device1) = register(&server).await;
    let (gateway, transport) = server.gateway();
    gateway
        .login(&request.email, &request.password, false)
        .await
        .unwrap();

    let response = server
        .post_auth(
            &format!("{API}/auth/logout"),
            &device1.access_token,
            &json!({"logoutAllDevices": true}),
        )
        .await
        .unwrap();
    assert_envelope(response, StatusCode::OK).await.unwrap();

    let err = gateway.get_json::<UserData>("/auth/me").await.unwrap_err();
    match err {
        ClientError::Refresh(RefreshError::Rejected { status, code }) => {
            assert_eq!(status, 401);
            assert_eq!(code.as_deref(), Some("INVALID_SESSION"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(transport.refresh_calls(), 1);
    assert!(gateway.storage().refresh_token().await.is_none());
}

#[tokio::test]
async fn test_gateway_logout_clears_tokens() {
    let server = TestServer::start().await.unwrap();
    let (request, _) = register(&server).await;
    let (gateway, _) = server.gateway();
    gateway
        .login(&request.email, &request.password, false)
        .await
        .unwrap();

    let logout = gateway.logout(false).await.unwrap();
    assert_eq!(logout.sessions_revoked, 1);
    assert!(gateway.storage().access_token().await.is_none());

    let err = gateway.get_json::<UserData>("/auth/me").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Refresh(RefreshError::MissingRefreshToken)
    ));
}

//! Integration tests — build the router over an in-memory store and drive the
//! signup/login/reset/admin flows through it.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use signin_api::{AppState, config::ApiConfig};
use signin_core::auth::bootstrap::{AdminSeed, ensure_admin};
use signin_core::auth::jwt::TokenService;
use signin_core::auth::memory::MemoryStore;
use signin_core::auth::secret::SigningKey;
use signin_core::auth::store::CredentialStore;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    tokens: TokenService,
}

fn test_app(config: ApiConfig) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let tokens = TokenService::new(SigningKey::from_bytes(vec![42u8; 32]).expect("key"));
    let state = AppState {
        store: store.clone(),
        tokens: tokens.clone(),
        config,
    };
    TestApp {
        router: signin_api::router(state),
        store,
        tokens,
    }
}

fn dev_config() -> ApiConfig {
    ApiConfig {
        expose_reset_token: true,
        ..ApiConfig::default()
    }
}

async fn send(
    app: &TestApp,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let req = builder.body(body).expect("request");

    let resp = app.router.clone().oneshot(req).await.expect("response");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse JSON")
    };
    (status, json)
}

async fn sign_up(app: &TestApp, username: &str, email: &str, password: &str) -> StatusCode {
    send(
        app,
        "POST",
        "/signup",
        None,
        Some(json!({"username": username, "email": email, "password": password})),
    )
    .await
    .0
}

async fn login(app: &TestApp, body: Value) -> (StatusCode, Value) {
    send(app, "POST", "/login", None, Some(body)).await
}

async fn token_for(app: &TestApp, username: &str, password: &str) -> String {
    let (status, body) = login(app, json!({"username": username, "password": password})).await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().expect("token").to_string()
}

#[tokio::test]
async fn signup_login_me_scenario() {
    let app = test_app(dev_config());

    assert_eq!(sign_up(&app, "alice", "a@x.com", "p1").await, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        "/signup",
        None,
        Some(json!({"username": "alice", "email": "other@x.com", "password": "p2"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "conflict");

    let token = token_for(&app, "alice", "p1").await;

    let (status, body) = send(&app, "GET", "/me", Some(&format!("Bearer {token}")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["role"], "user");

    let (status, _) = send(&app, "GET", "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn stored_password_is_hashed() {
    let app = test_app(dev_config());
    sign_up(&app, "alice", "a@x.com", "p1").await;

    assert!(app.store.exists("alice", "a@x.com").await.unwrap());
    let account = app.store.find_by_username("alice").await.unwrap();
    assert_ne!(account.password_hash, "p1");
}

#[tokio::test]
async fn login_accepts_email_as_identifier() {
    let app = test_app(dev_config());
    sign_up(&app, "alice", "a@x.com", "p1").await;

    let (status, body) = login(&app, json!({"email": "a@x.com", "password": "p1"})).await;
    assert_eq!(status, StatusCode::OK);
    let claims = app.tokens.validate(body["token"].as_str().unwrap()).unwrap();
    assert_eq!(claims.username, "alice");
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_identical() {
    let app = test_app(dev_config());
    sign_up(&app, "alice", "a@x.com", "p1").await;

    let wrong_password = login(&app, json!({"username": "alice", "password": "nope"})).await;
    let unknown_user = login(&app, json!({"username": "mallory", "password": "p1"})).await;

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_user);
}

#[tokio::test]
async fn unknown_user_login_still_runs_bcrypt() {
    let app = test_app(dev_config());

    let started = std::time::Instant::now();
    let (status, _) = login(&app, json!({"username": "mallory", "password": "p1"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    // A cost-10 bcrypt verification takes tens of milliseconds.
    assert!(started.elapsed() >= std::time::Duration::from_millis(10));
}

#[tokio::test]
async fn forgot_password_for_unknown_email_still_runs_bcrypt() {
    let app = test_app(dev_config());

    let started = std::time::Instant::now();
    let (status, _) = send(
        &app,
        "POST",
        "/forgot-password",
        None,
        Some(json!({"email": "nobody@x.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(started.elapsed() >= std::time::Duration::from_millis(10));
}

#[tokio::test]
async fn passwords_over_72_bytes_are_rejected() {
    let app = test_app(dev_config());
    let long = "p".repeat(73);

    let (status, body) = send(
        &app,
        "POST",
        "/signup",
        None,
        Some(json!({"username": "alice", "email": "a@x.com", "password": long})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(app.store.find_by_username("alice").await.is_err());

    assert_eq!(
        sign_up(&app, "alice", "a@x.com", &"p".repeat(72)).await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn signup_rejects_malformed_input() {
    let app = test_app(dev_config());

    let (status, body) = send(
        &app,
        "POST",
        "/signup",
        None,
        Some(json!({"username": "alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    assert_eq!(sign_up(&app, "", "a@x.com", "p1").await, StatusCode::BAD_REQUEST);
    assert_eq!(sign_up(&app, "alice", "not-an-email", "p1").await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn require_auth_rejects_bad_tokens() {
    let app = test_app(dev_config());
    sign_up(&app, "alice", "a@x.com", "p1").await;

    let expired = app
        .tokens
        .issue_at("alice", Utc::now() - Duration::hours(25))
        .unwrap();
    let foreign = TokenService::new(SigningKey::from_bytes(vec![1u8; 32]).unwrap())
        .issue("alice")
        .unwrap();
    let fresh = app.tokens.issue("alice").unwrap();

    for header_value in [
        "Bearer".to_string(),
        "Bearer ".to_string(),
        format!("Token {fresh}"),
        "Bearer not.a.token".to_string(),
        format!("Bearer {expired}"),
        format!("Bearer {foreign}"),
    ] {
        let (status, body) = send(&app, "GET", "/me", Some(&header_value), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "header {header_value:?}");
        assert_eq!(body["error"], "unauthorized");
    }

    let (status, _) = send(&app, "GET", "/me", Some(&format!("bearer {fresh}")), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn token_for_deleted_account_keeps_username_only() {
    let app = test_app(dev_config());
    sign_up(&app, "alice", "a@x.com", "p1").await;
    let auth = format!("Bearer {}", token_for(&app, "alice", "p1").await);

    let (status, body) = send(&app, "DELETE", "/delete", Some(&auth), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "account deleted successfully");

    let (status, body) = send(&app, "GET", "/me", Some(&auth), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert!(body["email"].is_null());
    assert!(body["role"].is_null());

    let (status, _) = send(&app, "DELETE", "/delete", Some(&auth), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = login(&app, json!({"username": "alice", "password": "p1"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let app = test_app(dev_config());
    ensure_admin(
        app.store.as_ref(),
        &AdminSeed {
            username: "root".into(),
            email: "root@localhost".into(),
            password: Some("rootpw".into()),
        },
    )
    .await
    .unwrap();
    sign_up(&app, "alice", "a@x.com", "p1").await;

    let (status, _) = send(&app, "GET", "/admin/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user = format!("Bearer {}", token_for(&app, "alice", "p1").await);
    let (status, body) = send(&app, "GET", "/admin/users", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let admin = format!("Bearer {}", token_for(&app, "root", "rootpw").await);
    let (status, body) = send(&app, "GET", "/admin/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().expect("array");
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password_hash").is_none()));
    assert!(users.iter().any(|u| u["username"] == "root" && u["role"] == "admin"));
}

#[tokio::test]
async fn reset_flow_is_single_use() {
    let app = test_app(dev_config());
    sign_up(&app, "alice", "a@x.com", "p1").await;

    let (status, body) = send(
        &app,
        "POST",
        "/forgot-password",
        None,
        Some(json!({"email": "a@x.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reset_token = body["reset_token"].as_str().expect("reset_token").to_string();

    let reset_body = json!({"token": reset_token, "password": "p2"});
    let (status, body) = send(&app, "POST", "/reset-password", None, Some(reset_body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "password reset successful");

    let (status, _) = login(&app, json!({"username": "alice", "password": "p1"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    token_for(&app, "alice", "p2").await;

    let (status, replay) = send(&app, "POST", "/reset-password", None, Some(reset_body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, unknown) = send(
        &app,
        "POST",
        "/reset-password",
        None,
        Some(json!({"token": "garbage", "password": "p3"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(replay, unknown);
}

#[tokio::test]
async fn forgot_password_does_not_reveal_accounts() {
    let app = test_app(ApiConfig::default());
    sign_up(&app, "alice", "a@x.com", "p1").await;

    let known = send(
        &app,
        "POST",
        "/forgot-password",
        None,
        Some(json!({"email": "a@x.com"})),
    )
    .await;
    let unknown = send(
        &app,
        "POST",
        "/forgot-password",
        None,
        Some(json!({"email": "nobody@x.com"})),
    )
    .await;

    assert_eq!(known.0, StatusCode::OK);
    assert_eq!(known, unknown);
    assert!(known.1.get("reset_token").is_none());
    assert_eq!(app.store.reset_count().await, 1);
}

#[tokio::test]
async fn change_password_requires_current_password() {
    let app = test_app(dev_config());
    sign_up(&app, "alice", "a@x.com", "p1").await;
    let auth = format!("Bearer {}", token_for(&app, "alice", "p1").await);

    let (status, _) = send(
        &app,
        "PUT",
        "/password",
        Some(&auth),
        Some(json!({"current_password": "wrong", "new_password": "p2"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "PUT",
        "/password",
        Some(&auth),
        Some(json!({"current_password": "p1", "new_password": "p2"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    token_for(&app, "alice", "p2").await;
}

#[tokio::test]
async fn legacy_plaintext_passwords_upgrade_only_when_enabled() {
    let locked = test_app(dev_config());
    sign_up(&locked, "alice", "a@x.com", "p1").await;
    locked.store.set_raw_password("alice", "legacy").await.unwrap();
    let (status, _) = login(&locked, json!({"username": "alice", "password": "legacy"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let app = test_app(ApiConfig {
        upgrade_legacy_passwords: true,
        ..dev_config()
    });
    sign_up(&app, "alice", "a@x.com", "p1").await;
    app.store.set_raw_password("alice", "legacy").await.unwrap();

    let (status, _) = login(&app, json!({"username": "alice", "password": "wrong"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    token_for(&app, "alice", "legacy").await;
    let account = app.store.find_by_username("alice").await.unwrap();
    assert_ne!(account.password_hash, "legacy");
    assert!(account.password_hash.starts_with("$2"));
}

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use scribr::api::AppState;
use scribr::config::Config;
use scribr::entities::tokens;
use sea_orm::{EntityTrait, PaginatorTrait, sea_query::Expr};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

async fn spawn_app_with_state() -> (Router, Arc<AppState>) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.server.secure_cookies = false;

    let state = scribr::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    let app = scribr::api::router(state.clone()).await;
    (app, state)
}

async fn spawn_app() -> Router {
    spawn_app_with_state().await.0
}

/// Backdate every token row so the next presentation finds it expired.
async fn expire_all_tokens(state: &AppState) {
    tokens::Entity::update_many()
        .col_expr(
            tokens::Column::Expires,
            Expr::value(chrono::Utc::now() - chrono::Duration::days(1)),
        )
        .exec(&state.store().conn)
        .await
        .expect("Failed to backdate tokens");
}

async fn sign_up(app: &Router, username: &str, email: &str, password: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sign-up/")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({
                        "username": username,
                        "email": email,
                        "name": username,
                        "password": password,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn login_api(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/login/")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from(format!("username={email}&password={password}")))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn get_me(app: &Router, auth_header: Option<&str>) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().uri("/api/users/me/");
    if let Some(value) = auth_header {
        builder = builder.header("Authorization", value);
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let www_authenticate = response
        .headers()
        .get("WWW-Authenticate")
        .map(|v| v.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap(), www_authenticate)
}

#[tokio::test]
async fn test_sign_up_issues_token() {
    let app = spawn_app().await;

    let (status, body) = sign_up(&app, "alice", "alice@example.com", "secret123").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["is_created"], true);
    assert!(body.get("password").is_none());

    let token = body["token"]["access_token"].as_str().unwrap();
    assert_eq!(token.len(), 32);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(body["token"]["token_type"], "bearer");
}

#[tokio::test]
async fn test_sign_up_duplicate_rejected() {
    let app = spawn_app().await;

    let (status, _) = sign_up(&app, "alice", "alice@example.com", "secret123").await;
    assert_eq!(status, StatusCode::OK);

    // Same email, different username.
    let (status, body) = sign_up(&app, "alice2", "alice@example.com", "secret123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email or username already registered");

    // Same username, different email.
    let (status, body) = sign_up(&app, "alice", "other@example.com", "secret123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email or username already registered");
}

#[tokio::test]
async fn test_login_activates_account() {
    let app = spawn_app().await;
    sign_up(&app, "alice", "alice@example.com", "secret123").await;

    let (status, grant) = login_api(&app, "alice@example.com", "secret123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(grant["token_type"], "bearer");

    let token = grant["access_token"].as_str().unwrap();
    let (status, me, _) = get_me(&app, Some(&format!("Bearer {token}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");
    assert_eq!(me["is_active"], true);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = spawn_app().await;
    sign_up(&app, "alice", "alice@example.com", "secret123").await;

    let (status, body) = login_api(&app, "alice@example.com", "wrong").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Incorrect password");

    let (status, body) = login_api(&app, "nobody@example.com", "secret123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Incorrect email");
}

#[tokio::test]
async fn test_inactive_account_rejected_with_400() {
    let app = spawn_app().await;

    // The sign-up token is valid but the account has never logged in.
    let (_, body) = sign_up(&app, "alice", "alice@example.com", "secret123").await;
    let token = body["token"]["access_token"].as_str().unwrap();

    let (status, body, _) = get_me(&app, Some(&format!("Bearer {token}"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Inactive user");
}

#[tokio::test]
async fn test_missing_and_garbage_tokens_look_identical() {
    let app = spawn_app().await;

    let (status, body, www) = get_me(&app, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid authentication credentials");
    assert_eq!(www.as_deref(), Some("Bearer"));

    let (status, body, www) = get_me(&app, Some("Bearer deadbeefdeadbeefdeadbeef")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid authentication credentials");
    assert_eq!(www.as_deref(), Some("Bearer"));
}

#[tokio::test]
async fn test_expired_token_rejected_like_absent() {
    let (app, state) = spawn_app_with_state().await;
    sign_up(&app, "alice", "alice@example.com", "secret123").await;

    let (_, grant) = login_api(&app, "alice@example.com", "secret123").await;
    let token = grant["access_token"].as_str().unwrap().to_string();

    expire_all_tokens(&state).await;

    // Same status, body, and challenge header as no token at all.
    let (status, body, www) = get_me(&app, Some(&format!("Bearer {token}"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid authentication credentials");
    assert_eq!(www.as_deref(), Some("Bearer"));

    let (absent_status, absent_body, absent_www) = get_me(&app, None).await;
    assert_eq!(status, absent_status);
    assert_eq!(body, absent_body);
    assert_eq!(www, absent_www);
}

#[tokio::test]
async fn test_login_after_expiry_mints_new_token() {
    let (app, state) = spawn_app_with_state().await;
    sign_up(&app, "alice", "alice@example.com", "secret123").await;

    let (_, first) = login_api(&app, "alice@example.com", "secret123").await;
    expire_all_tokens(&state).await;

    let (status, second) = login_api(&app, "alice@example.com", "secret123").await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(first["access_token"], second["access_token"]);

    // The fresh token works; the stale one does not.
    let new_token = second["access_token"].as_str().unwrap();
    let (status, _, _) = get_me(&app, Some(&format!("Bearer {new_token}"))).await;
    assert_eq!(status, StatusCode::OK);

    let old_token = first["access_token"].as_str().unwrap();
    let (status, _, _) = get_me(&app, Some(&format!("Bearer {old_token}"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Replacement happens in place: still a single row for the user.
    let rows = tokens::Entity::find()
        .count(&state.store().conn)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_concurrent_logins_leave_one_token_row() {
    let (app, state) = spawn_app_with_state().await;
    sign_up(&app, "alice", "alice@example.com", "secret123").await;

    // Force the insert path so the logins race the upsert, not the reuse.
    expire_all_tokens(&state).await;

    let (a, b, c, d) = tokio::join!(
        login_api(&app, "alice@example.com", "secret123"),
        login_api(&app, "alice@example.com", "secret123"),
        login_api(&app, "alice@example.com", "secret123"),
        login_api(&app, "alice@example.com", "secret123"),
    );

    for (status, grant) in [&a, &b, &c, &d] {
        assert_eq!(*status, StatusCode::OK);
        assert!(grant["access_token"].is_string());
    }

    let rows = tokens::Entity::find()
        .all(&state.store().conn)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    // The surviving row is live and authenticates.
    let token = &rows[0].token;
    let (status, _, _) = get_me(&app, Some(&format!("Bearer {token}"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_duplicate_sign_ups() {
    let app = spawn_app().await;

    let (a, b) = tokio::join!(
        sign_up(&app, "alice", "alice@example.com", "secret123"),
        sign_up(&app, "alice", "alice@example.com", "secret123"),
    );

    // Exactly one wins; the loser gets the duplicate message, not a 500.
    let mut statuses = [a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);

    for (status, body) in [a, b] {
        if status == StatusCode::BAD_REQUEST {
            assert_eq!(body["detail"], "Email or username already registered");
        }
    }
}

#[tokio::test]
async fn test_live_token_is_reused_across_logins() {
    let app = spawn_app().await;
    sign_up(&app, "alice", "alice@example.com", "secret123").await;

    let (_, first) = login_api(&app, "alice@example.com", "secret123").await;
    let (_, second) = login_api(&app, "alice@example.com", "secret123").await;

    assert_eq!(first["access_token"], second["access_token"]);
    assert_eq!(first["expires"], second["expires"]);
}

#[tokio::test]
async fn test_form_login_sets_bearer_cookie() {
    let app = spawn_app().await;
    sign_up(&app, "alice", "alice@example.com", "secret123").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from("username=alice%40example.com&password=secret123"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get("Location").unwrap(), "/users/");

    let cookie = response
        .headers()
        .get("Set-Cookie")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("bearer="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Expires="));

    // The cookie token authenticates API calls.
    let token = cookie
        .strip_prefix("bearer=")
        .and_then(|rest| rest.split(';').next())
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users/me/")
                .header("Cookie", format!("bearer={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_form_sign_up_redirects() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/create-user/")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from(
                    "username=bob&email=bob%40example.com&name=Bob&password=secret123",
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get("Location").unwrap(), "/create-user/");

    let (status, _) = login_api(&app, "bob@example.com", "secret123").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_list_users_requires_auth() {
    let app = spawn_app().await;
    sign_up(&app, "alice", "alice@example.com", "secret123").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users/all/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (_, grant) = login_api(&app, "alice@example.com", "secret123").await;
    let token = grant["access_token"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users/all/")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let users: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["username"], "alice");
}

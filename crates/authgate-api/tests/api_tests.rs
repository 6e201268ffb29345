//! API Integration Tests
//!
//! Every test drives the full router over an in-memory store.
//!
//! Author: hephaex@gmail.com

use authgate_api::{
    create_router, create_router_for_testing, state::AppState, store::MemoryStore, testing_state,
};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn bearer_request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let mut request = create_json_request(method, uri, body);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    request
}

fn cookie_request(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&body).unwrap()
}

/// `name=value` part of the refresh `Set-Cookie` header
fn refresh_cookie_pair(response: &Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refresh_token="))
        .and_then(|v| v.split(';').next())
        .expect("refresh_token cookie not set")
        .to_string()
}

async fn register(app: &Router, email: &str, password: &str) -> Response {
    app.clone()
        .oneshot(create_json_request(
            "POST",
            "/auth/register",
            Some(json!({ "email": email, "password": password })),
        ))
        .await
        .unwrap()
}

async fn login(app: &Router, email: &str, password: &str) -> Response {
    app.clone()
        .oneshot(create_json_request(
            "POST",
            "/auth/login",
            Some(json!({ "email": email, "password": password })),
        ))
        .await
        .unwrap()
}

/// Log in and return (access token, refresh cookie pair)
async fn login_tokens(app: &Router, email: &str, password: &str) -> (String, String) {
    let response = login(app, email, password).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = refresh_cookie_pair(&response);
    let body = json_body(response).await;
    (body["token"].as_str().unwrap().to_string(), cookie)
}

/// Router plus state with one admin account already created
async fn app_with_admin() -> (Router, Arc<AppState>) {
    let state = testing_state();
    state
        .tokens
        .create_user("admin@test.test", "admin-pw", true)
        .await
        .unwrap();
    (create_router(state.clone()), state)
}

// =============================================================================
// Health and Docs
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_openapi_spec_available() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json["openapi"].is_string());
    assert!(json["paths"]["/auth/login"].is_object());
    assert!(json["paths"]["/auth/admin/auth-token-page/{page}"].is_object());
}

// =============================================================================
// Registration and Login
// =============================================================================

#[tokio::test]
async fn test_register_and_login() {
    let app = create_router_for_testing();

    let response = register(&app, "a@b.com", "secret").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user = json_body(response).await;
    assert_eq!(user["email"], "a@b.com");
    assert_eq!(user["admin"], false);
    assert!(user.get("password_hash").is_none());

    let response = login(&app, "a@b.com", "secret").await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("refresh_token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Expires="));

    let body = json_body(response).await;
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert!(body["uuid"].is_string());
    assert!(body["exp"].is_i64());
}

#[tokio::test]
async fn test_register_validation() {
    let app = create_router_for_testing();

    let response = register(&app, "a@b.com", "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "a required field is empty" })
    );

    let response = register(&app, "invalid", "secret").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_failures_look_the_same() {
    let app = create_router_for_testing();
    register(&app, "a@b.com", "secret").await;

    let wrong_password = login(&app, "a@b.com", "nope").await;
    let unknown_email = login(&app, "nobody@b.com", "secret").await;

    assert_eq!(wrong_password.status(), StatusCode::NOT_FOUND);
    assert_eq!(unknown_email.status(), StatusCode::NOT_FOUND);
    assert!(wrong_password.headers().get(header::SET_COOKIE).is_none());

    let a = json_body(wrong_password).await;
    let b = json_body(unknown_email).await;
    assert_eq!(a, b);
    assert_eq!(a["error"], "invalid email or password");
}

#[tokio::test]
async fn test_malformed_login_body_is_json_error() {
    let app = create_router_for_testing();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("Content-Type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().is_some_and(|msg| !msg.is_empty()));

    // Well-formed JSON missing a field
    let response = app
        .oneshot(create_json_request(
            "POST",
            "/auth/register",
            Some(json!({ "email": "a@b.com" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn test_login_without_json_content_type_is_bad_request() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .body(Body::from(r#"{"email":"a@b.com","password":"x"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

// =============================================================================
// Admin Guard
// =============================================================================

#[tokio::test]
async fn test_non_admin_rejected_from_admin_routes() {
    let app = create_router_for_testing();
    register(&app, "a@b.com", "secret").await;
    let (access, _) = login_tokens(&app, "a@b.com", "secret").await;

    let response = app
        .oneshot(bearer_request("GET", "/auth/admin/user", &access, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({ "error": "unauthorized" }));
}

#[tokio::test]
async fn test_admin_routes_require_bearer() {
    let app = create_router_for_testing();

    let response = app
        .clone()
        .oneshot(create_json_request("GET", "/auth/admin/user", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(bearer_request("GET", "/auth/admin/user", "only.two", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await["error"],
        "token contains an invalid number of segments"
    );
}

#[tokio::test]
async fn test_refresh_token_rejected_as_bearer() {
    let (app, _) = app_with_admin().await;
    let (_, cookie) = login_tokens(&app, "admin@test.test", "admin-pw").await;
    let refresh = cookie.trim_start_matches("refresh_token=");

    let response = app
        .oneshot(bearer_request("GET", "/auth/admin/user", refresh, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unparsable_path_parameter_is_json_error() {
    let (app, _) = app_with_admin().await;
    let (access, _) = login_tokens(&app, "admin@test.test", "admin-pw").await;

    for uri in ["/auth/admin/user/abc", "/auth/admin/user-page/-1", "/auth/admin/auth-token-page/x"] {
        let response = app
            .clone()
            .oneshot(bearer_request("GET", uri, &access, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert!(json_body(response).await["error"].is_string(), "{uri}");
    }

    let response = app
        .oneshot(bearer_request(
            "POST",
            "/auth/admin/user/abc",
            &access,
            Some(json!({ "admin": true })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_user_management() {
    let (app, _) = app_with_admin().await;
    let (access, _) = login_tokens(&app, "admin@test.test", "admin-pw").await;

    // Create
    let response = app
        .clone()
        .oneshot(bearer_request(
            "POST",
            "/auth/admin/user",
            &access,
            Some(json!({ "email": "new@test.test", "password": "pw" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    let id = created["id"].as_i64().unwrap();

    // Update
    let response = app
        .clone()
        .oneshot(bearer_request(
            "POST",
            &format!("/auth/admin/user/{id}"),
            &access,
            Some(json!({ "email_verified": true, "password": "changed" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["email_verified"], true);

    // The new password works
    let response = login(&app, "new@test.test", "changed").await;
    assert_eq!(response.status(), StatusCode::OK);

    // Get and list
    let response = app
        .clone()
        .oneshot(bearer_request(
            "GET",
            &format!("/auth/admin/user/{id}"),
            &access,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["email"], "new@test.test");

    let response = app
        .clone()
        .oneshot(bearer_request("GET", "/auth/admin/user", &access, None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 2);

    // Delete, then it is gone
    let response = app
        .clone()
        .oneshot(bearer_request(
            "DELETE",
            &format!("/auth/admin/user/{id}"),
            &access,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(bearer_request(
            "GET",
            &format!("/auth/admin/user/{id}"),
            &access,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Refresh Rotation and Revocation
// =============================================================================

#[tokio::test]
async fn test_refresh_access_token() {
    let app = create_router_for_testing();
    register(&app, "a@b.com", "secret").await;
    let (old_access, cookie) = login_tokens(&app, "a@b.com", "secret").await;

    let response = app
        .clone()
        .oneshot(cookie_request("/auth/refresh-access-token", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_ne!(body["token"].as_str().unwrap(), old_access);

    // Rotation does not consume the refresh token
    let response = app
        .oneshot(cookie_request("/auth/refresh-access-token", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_without_cookie_is_unauthorized() {
    let app = create_router_for_testing();

    let response = app
        .clone()
        .oneshot(create_json_request("POST", "/auth/refresh-access-token", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(cookie_request(
            "/auth/refresh-access-token",
            "refresh_token=not.a.token",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_after_token_deleted_is_not_found() {
    let (app, state) = app_with_admin().await;
    register(&app, "a@b.com", "secret").await;
    let (_, cookie) = login_tokens(&app, "a@b.com", "secret").await;
    let (admin_access, _) = login_tokens(&app, "admin@test.test", "admin-pw").await;

    // Find the user's refresh token among the stored ones
    let refresh = cookie.trim_start_matches("refresh_token=");
    let stored = state.store().refresh_tokens().get_all().await.unwrap();
    let uuid = stored
        .iter()
        .find(|t| t.token_string == refresh)
        .unwrap()
        .uuid
        .clone();

    let response = app
        .clone()
        .oneshot(bearer_request(
            "DELETE",
            &format!("/auth/admin/auth-token/{uuid}"),
            &admin_access,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(cookie_request("/auth/refresh-access-token", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Deleting again reports the row as absent
    let response = app
        .oneshot(bearer_request(
            "DELETE",
            &format!("/auth/admin/auth-token/{uuid}"),
            &admin_access,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_refresh_after_user_deleted_is_not_found() {
    let (app, state) = app_with_admin().await;
    let user = json_body(register(&app, "a@b.com", "secret").await).await;
    let (_, cookie) = login_tokens(&app, "a@b.com", "secret").await;

    state
        .store()
        .users()
        .delete(user["id"].as_i64().unwrap())
        .await
        .unwrap();

    let response = app
        .oneshot(cookie_request("/auth/refresh-access-token", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "user not found");
}

#[tokio::test]
async fn test_logout() {
    let app = create_router_for_testing();
    register(&app, "a@b.com", "secret").await;
    let (_, cookie) = login_tokens(&app, "a@b.com", "secret").await;

    let response = app
        .clone()
        .oneshot(cookie_request("/auth/logout", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let response = app
        .clone()
        .oneshot(cookie_request("/auth/refresh-access-token", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(cookie_request("/auth/logout", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Pagination
// =============================================================================

#[tokio::test]
async fn test_auth_token_pages() {
    let (app, _) = app_with_admin().await;

    // The admin's own login is the first of 25 refresh tokens
    let (access, _) = login_tokens(&app, "admin@test.test", "admin-pw").await;
    for _ in 0..24 {
        login_tokens(&app, "admin@test.test", "admin-pw").await;
    }

    let page = |n: u32| {
        bearer_request(
            "GET",
            &format!("/auth/admin/auth-token-page/{n}"),
            &access,
            None,
        )
    };

    let response = app.clone().oneshot(page(0)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 20);

    let response = app.clone().oneshot(page(1)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 5);

    let response = app.clone().oneshot(page(2)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "insufficient token count" })
    );

    let response = app
        .oneshot(bearer_request("GET", "/auth/admin/auth-token", &access, None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 25);
}

#[tokio::test]
async fn test_user_page_beyond_range() {
    let (app, _) = app_with_admin().await;
    let (access, _) = login_tokens(&app, "admin@test.test", "admin-pw").await;

    let response = app
        .clone()
        .oneshot(bearer_request("GET", "/auth/admin/user-page/0", &access, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);

    let response = app
        .oneshot(bearer_request("GET", "/auth/admin/user-page/1", &access, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await["error"],
        "insufficient user count"
    );
}

// =============================================================================
// CORS
// =============================================================================

fn app_with_origins(origins: &[&str]) -> Router {
    let mut config = authgate_api::testing_config();
    config.server.cors_origins = origins.iter().map(|o| o.to_string()).collect();
    create_router(Arc::new(AppState::new(config, Arc::new(MemoryStore::new())).unwrap()))
}

fn preflight(origin: &str) -> Request<Body> {
    Request::builder()
        .method("OPTIONS")
        .uri("/auth/login")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_configured_origin_is_allowed_with_credentials() {
    let app = app_with_origins(&["http://localhost:3000"]);

    let response = app.oneshot(preflight("http://localhost:3000")).await.unwrap();
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_wildcard_origin_is_ignored() {
    let app = app_with_origins(&["*", "http://localhost:3000"]);

    let response = app
        .clone()
        .oneshot(preflight("http://evil.test"))
        .await
        .unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());

    let response = app.oneshot(preflight("http://localhost:3000")).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:3000"
    );
}

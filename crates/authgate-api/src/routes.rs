//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::auth::admin_middleware;
use crate::handlers::{auth, health, openapi_json, tokens, users};
use crate::state::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Routes mounted under `/auth`
pub fn auth_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Admin routes (bearer access token with the admin claim)
    let admin_routes = Router::new()
        .route("/user", get(users::list_users).post(users::create_user))
        .route(
            "/user/:id",
            get(users::get_user)
                .post(users::update_user)
                .delete(users::delete_user),
        )
        .route("/user-page/:page", get(users::get_user_page))
        .route("/auth-token", get(tokens::list_auth_tokens))
        .route(
            "/auth-token/:id",
            get(tokens::get_auth_token).delete(tokens::delete_auth_token),
        )
        .route("/auth-token-page/:page", get(tokens::get_auth_token_page))
        .route_layer(middleware::from_fn_with_state(state, admin_middleware));

    // Public routes
    Router::new()
        .route("/register", post(auth::register_handler))
        .route("/login", post(auth::login_handler))
        .route("/refresh-access-token", post(auth::refresh_handler))
        .route("/logout", post(auth::logout_handler))
        .route("/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/admin", admin_routes)
}

/// CORS for the configured origins
///
/// Credentials are allowed so browsers send the refresh cookie; with no
/// origins configured every cross-origin request is refused. A `*` entry
/// is dropped since credentialed CORS forbids it.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            _ if origin.trim() == "*" => {
                tracing::warn!("Ignoring wildcard CORS origin; list origins explicitly");
                None
            }
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

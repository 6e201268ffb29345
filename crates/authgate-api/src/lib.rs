//! AuthGate API - token lifecycle and credential validation service
//!
//! Issues short-lived access tokens and revocable refresh tokens, validates
//! bearer tokens on admin routes and exposes paginated administration of
//! users and refresh tokens.

pub mod audit;
pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod store;

use authgate_core::{AppConfig, PasswordConfig, TokenConfig};
use axum::Router;
use state::AppState;
use std::sync::Arc;
use store::MemoryStore;
use tower_http::trace::TraceLayer;

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = routes::cors_layer(&state.config.server.cors_origins);

    Router::new()
        .nest("/auth", routes::auth_routes(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Configuration for tests: fixed distinct secrets and a cheap hash cost
pub fn testing_config() -> AppConfig {
    AppConfig {
        token: TokenConfig {
            access_secret: "testing-access-secret".to_string(),
            refresh_secret: "testing-refresh-secret".to_string(),
            ..Default::default()
        },
        password: PasswordConfig {
            memory_cost: 4096,
            time_cost: 1,
            parallelism: 1,
        },
        ..Default::default()
    }
}

/// State over an empty in-memory store, for tests
pub fn testing_state() -> Arc<AppState> {
    match AppState::new(testing_config(), Arc::new(MemoryStore::new())) {
        Ok(state) => Arc::new(state),
        Err(e) => panic!("testing configuration is invalid: {e}"),
    }
}

/// Router over an empty in-memory store, for tests
pub fn create_router_for_testing() -> Router {
    create_router(testing_state())
}

//! API handlers
//!
//! Author: hephaex@gmail.com

pub mod auth;
pub mod health;
pub mod tokens;
pub mod users;

use crate::auth::{CreateUserRequest, Credentials};
use crate::error::ApiError;
use authgate_core::{AuthToken, User, UserUpdate};
use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI document for every route
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register_handler,
        auth::login_handler,
        auth::refresh_handler,
        auth::logout_handler,
        users::get_user,
        users::get_user_page,
        users::list_users,
        users::create_user,
        users::update_user,
        users::delete_user,
        tokens::get_auth_token,
        tokens::get_auth_token_page,
        tokens::list_auth_tokens,
        tokens::delete_auth_token,
    ),
    components(schemas(
        ApiError,
        AuthToken,
        User,
        UserUpdate,
        Credentials,
        CreateUserRequest,
        auth::LogoutResponse,
        health::HealthResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Registration, login and token refresh"),
        (name = "admin", description = "User and refresh-token administration"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serve the OpenAPI document as JSON
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

//! Admin refresh-token handlers
//!
//! Listing and revoking persisted refresh tokens. Deleting a row is the only
//! way to revoke a refresh token before it expires.
//!
//! Author: hephaex@gmail.com

use crate::auth::AccessClaims;
use crate::error::AppError;
use crate::extract::AppPath;
use crate::state::AppState;
use authgate_core::AuthToken;
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;

/// Get a refresh token by identifier
#[utoipa::path(
    get,
    path = "/auth/admin/auth-token/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Refresh token identifier")),
    responses(
        (status = 200, description = "Refresh token found", body = AuthToken),
        (status = 404, description = "Refresh token not found", body = crate::error::ApiError),
    ),
    security(("bearer" = []))
)]
pub async fn get_auth_token(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<String>,
) -> Result<Json<AuthToken>, AppError> {
    Ok(Json(state.store().refresh_tokens().get_by_id(&id).await?))
}

/// List one page of refresh tokens, in issue order
#[utoipa::path(
    get,
    path = "/auth/admin/auth-token-page/{page}",
    tag = "admin",
    params(("page" = u64, Path, description = "Zero-based page index")),
    responses(
        (status = 200, description = "Refresh tokens on the page", body = Vec<AuthToken>),
        (status = 404, description = "Page beyond the last token", body = crate::error::ApiError),
    ),
    security(("bearer" = []))
)]
pub async fn get_auth_token_page(
    State(state): State<Arc<AppState>>,
    AppPath(page): AppPath<u64>,
) -> Result<Json<Vec<AuthToken>>, AppError> {
    Ok(Json(state.store().refresh_tokens().get_page(page).await?))
}

/// List every refresh token, expired rows included
#[utoipa::path(
    get,
    path = "/auth/admin/auth-token",
    tag = "admin",
    responses((status = 200, description = "All refresh tokens", body = Vec<AuthToken>)),
    security(("bearer" = []))
)]
pub async fn list_auth_tokens(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AuthToken>>, AppError> {
    Ok(Json(state.store().refresh_tokens().get_all().await?))
}

/// Revoke a refresh token
#[utoipa::path(
    delete,
    path = "/auth/admin/auth-token/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Refresh token identifier")),
    responses(
        (status = 200, description = "Refresh token revoked"),
        (status = 404, description = "Refresh token not found", body = crate::error::ApiError),
    ),
    security(("bearer" = []))
)]
pub async fn delete_auth_token(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AccessClaims>,
    AppPath(id): AppPath<String>,
) -> Result<StatusCode, AppError> {
    state
        .tokens
        .revoke_refresh_token(&id, Some(claims.user_id))
        .await?;
    Ok(StatusCode::OK)
}

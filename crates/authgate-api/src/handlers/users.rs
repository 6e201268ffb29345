//! Admin user management handlers
//!
//! Every route here sits behind the admin middleware.
//!
//! Author: hephaex@gmail.com

use crate::auth::CreateUserRequest;
use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::state::AppState;
use authgate_core::{User, UserUpdate};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use std::sync::Arc;

/// Get a user by id
#[utoipa::path(
    get,
    path = "/auth/admin/user/{id}",
    tag = "admin",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 401, description = "Not an admin", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(("bearer" = []))
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.store().users().get_by_id(id).await?))
}

/// List one page of users
#[utoipa::path(
    get,
    path = "/auth/admin/user-page/{page}",
    tag = "admin",
    params(("page" = u64, Path, description = "Zero-based page index")),
    responses(
        (status = 200, description = "Users on the page", body = Vec<User>),
        (status = 404, description = "Page beyond the last user", body = crate::error::ApiError),
    ),
    security(("bearer" = []))
)]
pub async fn get_user_page(
    State(state): State<Arc<AppState>>,
    AppPath(page): AppPath<u64>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.store().users().get_page(page).await?))
}

/// List every user
#[utoipa::path(
    get,
    path = "/auth/admin/user",
    tag = "admin",
    responses((status = 200, description = "All users", body = Vec<User>)),
    security(("bearer" = []))
)]
pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.store().users().get_all().await?))
}

/// Create a user, optionally with the admin flag
#[utoipa::path(
    post,
    path = "/auth/admin/user",
    tag = "admin",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
    ),
    security(("bearer" = []))
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state
        .tokens
        .create_user(&request.email, &request.password, request.admin)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Apply a partial update to a user
#[utoipa::path(
    post,
    path = "/auth/admin/user/{id}",
    tag = "admin",
    params(("id" = i64, Path, description = "User id")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(("bearer" = []))
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i64>,
    AppJson(update): AppJson<UserUpdate>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.tokens.update_user(id, update).await?))
}

/// Delete a user
///
/// Refresh tokens issued to the user stay in the store but can no longer be
/// rotated, since rotation loads the owning user.
#[utoipa::path(
    delete,
    path = "/auth/admin/user/{id}",
    tag = "admin",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(("bearer" = []))
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    state.store().users().delete(id).await?;
    tracing::info!(user_id = id, "User deleted");
    Ok(StatusCode::OK)
}

//! Public authentication handlers
//!
//! Register, login, access-token refresh and logout. The access token travels
//! in the JSON body; the refresh token only ever travels in an HTTP-only
//! cookie scoped to `/auth`.
//!
//! Author: hephaex@gmail.com

use crate::auth::{cookie_value, Credentials};
use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;
use authgate_core::{AuthGateError, AuthToken, TokenConfig, User};
use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use cookie::time::{Duration, OffsetDateTime};
use cookie::Cookie;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Path the refresh cookie is scoped to
pub const COOKIE_PATH: &str = "/auth";

/// Logout response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

fn header_value(cookie: Cookie<'_>) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| AppError::Internal(format!("invalid cookie header: {e}")))
}

/// `Set-Cookie` value carrying a freshly issued refresh token
pub fn refresh_cookie(config: &TokenConfig, token: &AuthToken) -> Result<HeaderValue, AppError> {
    let expires = OffsetDateTime::from_unix_timestamp(token.expires)
        .map_err(|e| AppError::Internal(format!("invalid refresh token expiry: {e}")))?;

    header_value(
        Cookie::build((
            config.refresh_cookie_name.clone(),
            token.token_string.clone(),
        ))
        .http_only(true)
        .secure(config.secure_cookie)
        .path(COOKIE_PATH)
        .expires(expires)
        .build(),
    )
}

/// `Set-Cookie` value that clears the refresh cookie
pub fn clear_refresh_cookie(config: &TokenConfig) -> Result<HeaderValue, AppError> {
    header_value(
        Cookie::build((config.refresh_cookie_name.clone(), ""))
            .http_only(true)
            .secure(config.secure_cookie)
            .path(COOKIE_PATH)
            .max_age(Duration::ZERO)
            .build(),
    )
}

fn presented_refresh_token(state: &AppState, headers: &HeaderMap) -> Result<String, AppError> {
    cookie_value(headers, &state.config.token.refresh_cookie_name).ok_or_else(|| {
        AppError::from(AuthGateError::Unauthorized(
            "missing refresh token cookie".to_string(),
        ))
    })
}

/// Register a new user account
///
/// Accounts created here are never admins.
///
/// # Responses
///
/// * `201 Created` - User registered
/// * `400 Bad Request` - Invalid email or empty password
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = Credentials,
    responses(
        (status = 201, description = "User registered successfully", body = User),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<Credentials>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state
        .tokens
        .register(&request.email, &request.password)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticate and receive a token pair
///
/// The access token is returned in the body and the refresh token is set as
/// an HTTP-only cookie. Unknown email and wrong password get the same answer.
///
/// # Responses
///
/// * `200 OK` - Access token in the body, refresh token cookie set
/// * `404 Not Found` - Invalid email or password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = Credentials,
    responses(
        (status = 200, description = "Login successful", body = AuthToken),
        (status = 404, description = "Invalid email or password", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<Credentials>,
) -> Result<Response, AppError> {
    let outcome = state
        .tokens
        .login(&request.email, &request.password)
        .await?;
    let cookie = refresh_cookie(&state.config.token, &outcome.refresh)?;

    let mut response = Json(outcome.access).into_response();
    response.headers_mut().append(SET_COOKIE, cookie);
    Ok(response)
}

/// Exchange the refresh cookie for a new access token
///
/// # Responses
///
/// * `200 OK` - New access token
/// * `401 Unauthorized` - Cookie missing, malformed, mis-signed or expired
/// * `404 Not Found` - Refresh token revoked or user deleted
#[utoipa::path(
    post,
    path = "/auth/refresh-access-token",
    tag = "auth",
    responses(
        (status = 200, description = "Access token refreshed", body = AuthToken),
        (status = 401, description = "Invalid refresh token", body = crate::error::ApiError),
        (status = 404, description = "Refresh token revoked or user gone", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AuthToken>, AppError> {
    let token = presented_refresh_token(&state, &headers)?;
    let access = state.tokens.rotate_access_token(&token).await?;
    Ok(Json(access))
}

/// Revoke the refresh cookie and clear it
///
/// # Responses
///
/// * `200 OK` - Refresh token revoked
/// * `401 Unauthorized` - Cookie missing or invalid
/// * `404 Not Found` - Already revoked
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse),
        (status = 401, description = "Invalid refresh token", body = crate::error::ApiError),
        (status = 404, description = "Refresh token already revoked", body = crate::error::ApiError),
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let token = presented_refresh_token(&state, &headers)?;
    state.tokens.logout(&token).await?;
    let cookie = clear_refresh_cookie(&state.config.token)?;

    let mut response = Json(LogoutResponse {
        message: "Logged out".to_string(),
    })
    .into_response();
    response.headers_mut().append(SET_COOKIE, cookie);
    Ok(response)
}

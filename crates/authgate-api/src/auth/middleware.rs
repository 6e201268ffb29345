//! Request authentication for admin routes
//!
//! Extracts the bearer token, validates it through the token service and runs
//! the admin guard. On success the decoded [`AccessClaims`] are added to the
//! request extensions for handlers to read with `Extension<AccessClaims>`.
use super::guard::require_admin;
use super::jwt::{AccessClaims, JwtError};
use crate::audit::{audit_log, AuditEvent};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use cookie::Cookie;
use std::sync::Arc;
use thiserror::Error;

/// Authentication middleware errors
///
/// Every variant is a 401; the guard deliberately does not use 403.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingAuthHeader,

    #[error("invalid authorization header format")]
    InvalidAuthHeader,

    #[error("{0}")]
    InvalidToken(#[from] JwtError),

    #[error("token is not authorized")]
    NotAuthorized,

    #[error("unauthorized")]
    NotAdmin,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

/// Bearer token from the `Authorization` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}

/// Value of the cookie called `name`, searching every `Cookie` header
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|part| Cookie::parse(part.trim().to_string()).ok())
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

/// Middleware guarding the admin routes
///
/// # Usage
///
/// ```ignore
/// let admin = Router::new()
///     .route("/user", get(list_users))
///     .route_layer(middleware::from_fn_with_state(state.clone(), admin_middleware));
/// ```
pub async fn admin_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let resource = request.uri().path().to_string();

    let claims = match bearer_token(request.headers())
        .and_then(|token| state.tokens.validate_access_token(token))
    {
        Ok(claims) => claims,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                resource,
                reason: e.to_string(),
            });
            return Err(e);
        }
    };

    if let Err(e) = require_admin(&claims) {
        audit_log(&AuditEvent::AccessDenied {
            user_id: claims.user_id,
            resource,
        });
        return Err(e);
    }

    request.extensions_mut().insert::<AccessClaims>(claims);
    Ok(next.run(request).await)
}

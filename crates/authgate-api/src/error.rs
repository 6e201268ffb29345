//! API error handling
//!
//! Every error response is a single-field JSON body: `{"error": "<message>"}`.
//!
//! Author: hephaex@gmail.com

use authgate_core::AuthGateError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Human-readable message
    pub error: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed with server fault");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ApiError::new(message))).into_response()
    }
}

impl From<AuthGateError> for AppError {
    fn from(err: AuthGateError) -> Self {
        match err {
            AuthGateError::Validation(msg) => AppError::BadRequest(msg),
            AuthGateError::NotFound(msg) | AuthGateError::InsufficientCount(msg) => {
                AppError::NotFound(msg)
            }
            AuthGateError::Unauthorized(msg) => AppError::Unauthorized(msg),
            err @ (AuthGateError::Configuration(_)
            | AuthGateError::Database(_)
            | AuthGateError::Internal(_)
            | AuthGateError::Other(_)) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

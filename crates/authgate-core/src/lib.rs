//! AuthGate Core - Domain models, validation and shared types
//!
//! This crate defines the pieces shared by the API server and the operator CLI:
//! - User and refresh-token models with their validation rules
//! - The pagination policy used by every listing operation
//! - The error taxonomy surfaced to callers
//! - Configuration management

pub mod config;
pub mod models;
pub mod pagination;

pub use config::{
    AppConfig, ConfigError, DatabaseConfig, LoggingConfig, PasswordConfig, ServerConfig,
    StoreBackend, TokenConfig,
};
pub use models::{AuthToken, User, UserUpdate, ValidationError};
pub use pagination::{page_window, paginate, PAGE_SIZE};

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Error taxonomy for AuthGate operations
///
/// Every failure is terminal for the current request; nothing in the service
/// retries. The HTTP layer maps each variant onto a status code.
#[derive(Error, Debug)]
pub enum AuthGateError {
    /// Malformed email, empty password and similar caller mistakes
    #[error("{0}")]
    Validation(String),

    /// User or token absent
    #[error("{0}")]
    NotFound(String),

    /// Requested page starts beyond the last record
    #[error("{0}")]
    InsufficientCount(String),

    /// Missing, invalid, expired or mis-signed token, or a non-admin caller
    #[error("{0}")]
    Unauthorized(String),

    /// Signing failure or missing secret. Not recoverable per request.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AuthGateError {
    pub fn unauthorized() -> Self {
        Self::Unauthorized("unauthorized".to_string())
    }

    /// True for failures that indicate a server fault rather than a bad request
    pub fn is_server_fault(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Database(_) | Self::Internal(_) | Self::Other(_)
        )
    }
}

impl From<ValidationError> for AuthGateError {
    fn from(err: ValidationError) -> Self {
        AuthGateError::Validation(err.to_string())
    }
}

impl From<ConfigError> for AuthGateError {
    fn from(err: ConfigError) -> Self {
        AuthGateError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuthGateError>;

//! Domain models for users and issued tokens
//!
//! - User: account record with its credential and status flags
//! - UserUpdate: partial field set applied by administrators
//! - AuthToken: an issued access or refresh token (only refresh tokens are persisted)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidateEmail;

/// Field validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("a required field is empty")]
    EmptyField,

    #[error("email address is empty")]
    EmptyEmail,

    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

/// Check that `email` is non-empty and parses as an address
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(ValidationError::EmptyEmail);
    }
    if !email.validate_email() {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

/// Check that a password credential is present
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField);
    }
    Ok(())
}

/// User account model
///
/// Maps to the `users` table. The credential is only ever held in hashed form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Store-assigned identifier (0 until inserted)
    pub id: i64,

    pub email: String,

    /// Opaque password hash, never serialized in responses
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub active: bool,
    pub email_verified: bool,
    pub email_subscribed: bool,
    pub admin: bool,

    pub created: DateTime<Utc>,

    /// Kept for the record; login does not currently update it
    pub last_login: DateTime<Utc>,
    pub last_action: DateTime<Utc>,
}

impl User {
    /// Build a validated, not yet persisted user
    ///
    /// New accounts start active, unverified and subscribed.
    pub fn new(
        email: &str,
        password_hash: &str,
        admin: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        validate_password(password_hash)?;
        validate_email(email)?;

        Ok(Self {
            id: 0,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            active: true,
            email_verified: false,
            email_subscribed: true,
            admin,
            created: now,
            last_login: now,
            last_action: now,
        })
    }
}

/// Partial update of a user record
///
/// Absent fields are left untouched. `password` carries the new credential;
/// the service layer hashes it before it reaches a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_subscribed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<bool>,
}

impl UserUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password.is_none()
            && self.active.is_none()
            && self.email_verified.is_none()
            && self.email_subscribed.is_none()
            && self.admin.is_none()
    }

    /// Apply the present fields to `user`
    pub fn apply_to(&self, user: &mut User) {
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(password) = &self.password {
            user.password_hash = password.clone();
        }
        if let Some(active) = self.active {
            user.active = active;
        }
        if let Some(verified) = self.email_verified {
            user.email_verified = verified;
        }
        if let Some(subscribed) = self.email_subscribed {
            user.email_subscribed = subscribed;
        }
        if let Some(admin) = self.admin {
            user.admin = admin;
        }
    }
}

/// An issued token: identifier, signed string and absolute expiry
///
/// Refresh tokens are persisted in this exact shape (`refresh_token` table:
/// `id`, `token_string`, `expires`); the identifier is both primary key and
/// revocation handle. Access tokens are returned to the caller and forgotten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthToken {
    /// Unique token identifier
    pub uuid: String,

    /// Signed, serialized claim set
    #[serde(rename = "token")]
    pub token_string: String,

    /// Expiry as Unix seconds
    #[serde(rename = "exp")]
    pub expires: i64,
}

impl AuthToken {
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires
    }
}

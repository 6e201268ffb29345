//! Credential Store contract
//!
//! The token service and the HTTP handlers depend only on these traits. Two
//! implementations exist and one is chosen at start-up:
//! - [`MemoryStore`]: process-local, used by tests and single-node dev runs
//! - [`PgStore`]: PostgreSQL via sqlx
//!
//! Refresh-token rows are the revocation list: a row exists iff its token may
//! still be rotated, and deleting it is the only way to revoke.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use authgate_core::{AuthGateError, AuthToken, Result, User, UserUpdate};
use chrono::{DateTime, Utc};

/// User record operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch a user by identifier
    async fn get_by_id(&self, id: i64) -> Result<User>;

    /// Fetch a user by email; the address is validated first
    async fn get_by_email(&self, email: &str) -> Result<User>;

    /// Every user, in insertion order
    async fn get_all(&self) -> Result<Vec<User>>;

    /// One fixed-size page of users, in insertion order
    async fn get_page(&self, page: u64) -> Result<Vec<User>>;

    /// Validate and persist a new user, returning it with its assigned id
    ///
    /// # Arguments
    ///
    /// * `email` - Must be non-empty and a parseable address
    /// * `password_hash` - Already hashed credential, must be non-empty
    /// * `admin` - Initial admin flag
    /// * `now` - Creation timestamp
    async fn insert(
        &self,
        email: &str,
        password_hash: &str,
        admin: bool,
        now: DateTime<Utc>,
    ) -> Result<User>;

    /// Apply a partial update; `update.password` must already be hashed
    async fn update(&self, id: i64, update: &UserUpdate) -> Result<User>;

    async fn delete(&self, id: i64) -> Result<()>;
}

/// Refresh-token record operations
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Persist an issued refresh token under its identifier
    async fn insert(&self, token: &AuthToken) -> Result<()>;

    /// Existence check used by rotation; no expiry check happens here
    async fn get_by_id(&self, id: &str) -> Result<AuthToken>;

    async fn get_all(&self) -> Result<Vec<AuthToken>>;

    async fn get_page(&self, page: u64) -> Result<Vec<AuthToken>>;

    /// Revoke a refresh token. Fails with `NotFound` when already absent.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Remove rows whose expiry is at or before `now`, returning the count
    async fn delete_expired(&self, now: i64) -> Result<u64>;
}

/// The capability set the service is built against
pub trait CredentialStore: Send + Sync {
    fn users(&self) -> &dyn UserRepository;
    fn refresh_tokens(&self) -> &dyn RefreshTokenRepository;
}

pub(crate) fn user_not_found() -> AuthGateError {
    AuthGateError::NotFound("user not found".to_string())
}

pub(crate) fn token_not_found() -> AuthGateError {
    AuthGateError::NotFound("refresh token not found".to_string())
}

pub(crate) fn insufficient_users() -> AuthGateError {
    AuthGateError::InsufficientCount("insufficient user count".to_string())
}

pub(crate) fn insufficient_tokens() -> AuthGateError {
    AuthGateError::InsufficientCount("insufficient token count".to_string())
}

//! Token service
//!
//! Mints access and refresh tokens, validates bearer tokens and exchanges a
//! refresh token for a new access token. Also owns the account operations
//! that touch credentials (register, login, admin create/update), since those
//! are the only places a plaintext password is seen.
//!
//! Access tokens are stateless: validation never consults the store, so an
//! access token stays valid until it expires even if the user is demoted or
//! deleted. Refresh tokens are revocable by deleting their store row.

use std::sync::Arc;

use authgate_core::{
    models::validate_email, AppConfig, AuthGateError, AuthToken, Result, User, UserUpdate,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::jwt::{AccessClaims, ClaimsCodec, RefreshClaims};
use super::middleware::AuthError;
use super::password::CredentialHasher;
use crate::audit::{audit_log, AuditEvent};
use crate::store::CredentialStore;

/// Email and password pair accepted by register and login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Admin request to create an account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub admin: bool,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub access: AuthToken,
    pub refresh: AuthToken,
}

fn invalid_credentials() -> AuthGateError {
    AuthGateError::NotFound("invalid email or password".to_string())
}

/// Token service
pub struct TokenService {
    codec: ClaimsCodec,
    hasher: CredentialHasher,
    store: Arc<dyn CredentialStore>,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenService {
    /// Build the service from configuration and a credential store
    ///
    /// Fails with `Configuration` when a secret is missing or the password
    /// cost parameters are invalid.
    pub fn new(config: &AppConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let codec = ClaimsCodec::new(&config.token)?;
        let hasher = CredentialHasher::new(&config.password)?;

        Ok(Self {
            codec,
            hasher,
            store,
            access_ttl_secs: ttl_secs(config.token.access_ttl_secs)?,
            refresh_ttl_secs: ttl_secs(config.token.refresh_ttl_secs)?,
        })
    }

    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    // ------------------------------------------------------------------------
    // Issuance
    // ------------------------------------------------------------------------

    /// Mint an access token for `user`. Nothing is persisted.
    pub fn issue_access_token(&self, user: &User) -> Result<AuthToken> {
        self.issue_access_token_at(user, Utc::now().timestamp())
    }

    pub fn issue_access_token_at(&self, user: &User, now: i64) -> Result<AuthToken> {
        let claims = AccessClaims {
            authorized: true,
            user_id: user.id,
            admin: user.admin,
            access_uuid: Uuid::new_v4().to_string(),
            exp: expiry(now, self.access_ttl_secs, "JWT_ACCESS_TTL_SECS")?,
        };
        let token_string = self.codec.encode(&claims)?;

        Ok(AuthToken {
            uuid: claims.access_uuid,
            token_string,
            expires: claims.exp,
        })
    }

    /// Mint a refresh token for `user`
    ///
    /// The caller persists it; see [`TokenService::login`].
    pub fn issue_refresh_token(&self, user: &User) -> Result<AuthToken> {
        self.issue_refresh_token_at(user, Utc::now().timestamp())
    }

    pub fn issue_refresh_token_at(&self, user: &User, now: i64) -> Result<AuthToken> {
        let claims = RefreshClaims {
            user_id: user.id,
            admin: user.admin,
            refresh_uuid: Uuid::new_v4().to_string(),
            exp: expiry(now, self.refresh_ttl_secs, "JWT_REFRESH_TTL_SECS")?,
        };
        let token_string = self.codec.encode(&claims)?;

        Ok(AuthToken {
            uuid: claims.refresh_uuid,
            token_string,
            expires: claims.exp,
        })
    }

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------

    /// Verify a bearer token against the access secret
    ///
    /// Stateless: the store is not consulted.
    pub fn validate_access_token(
        &self,
        bearer: &str,
    ) -> std::result::Result<AccessClaims, AuthError> {
        let claims: AccessClaims = self.codec.decode(bearer)?;
        if !claims.authorized {
            return Err(AuthError::NotAuthorized);
        }
        Ok(claims)
    }

    /// Verify a refresh cookie value and confirm it has not been revoked
    async fn check_refresh_token(&self, cookie: &str) -> Result<RefreshClaims> {
        let claims: RefreshClaims = self.codec.decode(cookie).map_err(|e| {
            audit_log(&AuditEvent::RefreshRejected {
                reason: e.to_string(),
            });
            AuthGateError::from(e)
        })?;

        if let Err(e) = self.store.refresh_tokens().get_by_id(&claims.refresh_uuid).await {
            if matches!(e, AuthGateError::NotFound(_)) {
                audit_log(&AuditEvent::RefreshRejected {
                    reason: format!("refresh token {} is revoked", claims.refresh_uuid),
                });
            }
            return Err(e);
        }

        Ok(claims)
    }

    /// Exchange a refresh token for a new access token
    ///
    /// # Arguments
    ///
    /// * `cookie` - Signed refresh token as presented by the caller
    ///
    /// # Returns
    ///
    /// * `Ok(AuthToken)` - Fresh access token carrying the user's current admin flag
    /// * `Err(Unauthorized)` - Malformed, mis-signed or expired refresh token
    /// * `Err(NotFound)` - Token revoked, or its user no longer exists
    ///
    /// The refresh token itself is not replaced and stays valid until it
    /// expires or is deleted.
    pub async fn rotate_access_token(&self, cookie: &str) -> Result<AuthToken> {
        let claims = self.check_refresh_token(cookie).await?;
        let user = self.store.users().get_by_id(claims.user_id).await?;
        let access = self.issue_access_token(&user)?;

        audit_log(&AuditEvent::TokenRefresh {
            user_id: user.id,
            refresh_uuid: claims.refresh_uuid,
        });

        Ok(access)
    }

    /// Revoke the presented refresh token
    ///
    /// Fails with `Unauthorized` when the token does not verify and
    /// `NotFound` when it was already revoked.
    pub async fn logout(&self, cookie: &str) -> Result<RefreshClaims> {
        let claims: RefreshClaims = self.codec.decode(cookie)?;
        self.store
            .refresh_tokens()
            .delete(&claims.refresh_uuid)
            .await?;

        audit_log(&AuditEvent::Logout {
            user_id: claims.user_id,
            refresh_uuid: claims.refresh_uuid.clone(),
        });

        Ok(claims)
    }

    /// Delete a refresh-token row by identifier
    pub async fn revoke_refresh_token(&self, id: &str, revoked_by: Option<i64>) -> Result<()> {
        self.store.refresh_tokens().delete(id).await?;

        audit_log(&AuditEvent::RefreshTokenRevoked {
            refresh_uuid: id.to_string(),
            revoked_by,
        });
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Credentials
    // ------------------------------------------------------------------------

    /// Authenticate and issue a token pair
    ///
    /// The refresh token is persisted before anything is returned; if the
    /// insert fails the login fails. Every credential failure, including a
    /// malformed email, surfaces as the same `NotFound` message.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let user = match self.store.users().get_by_email(email).await {
            Ok(user) => user,
            Err(e) if e.is_server_fault() => return Err(e),
            Err(e) => {
                audit_log(&AuditEvent::LoginFailure {
                    email: email.to_string(),
                    reason: e.to_string(),
                });
                return Err(invalid_credentials());
            }
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            audit_log(&AuditEvent::LoginFailure {
                email: email.to_string(),
                reason: "password mismatch".to_string(),
            });
            return Err(invalid_credentials());
        }

        let access = self.issue_access_token(&user)?;
        let refresh = self.issue_refresh_token(&user)?;
        self.store.refresh_tokens().insert(&refresh).await?;

        debug!(user_id = user.id, "Issued token pair");
        audit_log(&AuditEvent::LoginSuccess {
            user_id: user.id,
            email: user.email.clone(),
            refresh_uuid: refresh.uuid.clone(),
        });

        Ok(LoginOutcome {
            user,
            access,
            refresh,
        })
    }

    /// Create a non-admin account
    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        let user = self.create_user(email, password, false).await?;

        audit_log(&AuditEvent::Registration {
            user_id: user.id,
            email: user.email.clone(),
        });
        Ok(user)
    }

    /// Validate, hash and insert an account
    pub async fn create_user(&self, email: &str, password: &str, admin: bool) -> Result<User> {
        validate_email(email)?;
        let hash = self.hasher.hash(password)?;
        self.store
            .users()
            .insert(email, &hash, admin, Utc::now())
            .await
    }

    /// Apply an admin update, hashing a new password if one is present
    pub async fn update_user(&self, id: i64, mut update: UserUpdate) -> Result<User> {
        update.validate()?;
        if let Some(password) = update.password.take() {
            update.password = Some(self.hasher.hash(&password)?);
        }

        let user = self.store.users().update(id, &update).await?;
        if update.admin.is_some() {
            warn!(
                user_id = id,
                admin = user.admin,
                "Admin flag changed; outstanding access tokens keep the old value until they expire"
            );
        }
        Ok(user)
    }
}

fn ttl_secs(secs: u64) -> Result<i64> {
    i64::try_from(secs)
        .ok()
        .filter(|s| *s > 0)
        .ok_or_else(|| AuthGateError::Configuration(format!("invalid token lifetime: {secs}")))
}

/// `now + ttl`, refusing lifetimes that overflow the timestamp
fn expiry(now: i64, ttl: i64, key: &str) -> Result<i64> {
    now.checked_add(ttl)
        .ok_or_else(|| AuthGateError::Configuration(format!("{key} overflows the token expiry")))
}

//! Password hashing and verification using Argon2id
//!
//! Hashes are PHC strings, so the cost parameters and salt travel with the
//! hash and verification never needs the configuration that produced it.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use authgate_core::{AuthGateError, PasswordConfig};
use thiserror::Error;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("a required field is empty")]
    EmptyPassword,

    #[error("invalid password hashing parameters: {0}")]
    InvalidParams(String),

    #[error("failed to hash password: {0}")]
    HashingFailed(String),

    #[error("failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("invalid password hash format")]
    InvalidHashFormat,
}

impl From<PasswordError> for AuthGateError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::EmptyPassword => AuthGateError::Validation(err.to_string()),
            PasswordError::InvalidParams(_) => AuthGateError::Configuration(err.to_string()),
            _ => AuthGateError::Internal(err.to_string()),
        }
    }
}

/// One-way credential comparator
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    /// Build a hasher with the configured cost
    pub fn new(config: &PasswordConfig) -> Result<Self, PasswordError> {
        let params = Params::new(
            config.memory_cost,
            config.time_cost,
            config.parallelism,
            None,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
        })
    }

    /// Hash a plaintext password
    ///
    /// # Arguments
    ///
    /// * `password` - The plaintext password, must be non-empty
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - PHC string (algorithm, parameters, salt and hash)
    /// * `Err(PasswordError)` - Empty password or hashing failure
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if password.is_empty() {
            return Err(PasswordError::EmptyPassword);
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Compare a plaintext password against a stored hash
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Password matches
    /// * `Ok(false)` - Password does not match
    /// * `Err(PasswordError)` - The stored hash is unusable
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
        }
    }
}

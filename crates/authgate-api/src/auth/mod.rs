//! Authentication and authorization module
//!
//! - Claims codec: signing and verifying access/refresh claim sets
//! - Password hashing with Argon2
//! - Token service: issuance, validation and refresh rotation
//! - Access control guard and the admin-route middleware

pub mod guard;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use guard::{is_admin, require_admin};
pub use jwt::{
    decode_claims, encode_claims, AccessClaims, ClaimsCodec, JwtError, RefreshClaims,
    TokenClaims, TokenKind,
};
pub use middleware::{admin_middleware, bearer_token, cookie_value, AuthError};
pub use password::{CredentialHasher, PasswordError};
pub use service::{CreateUserRequest, Credentials, LoginOutcome, TokenService};

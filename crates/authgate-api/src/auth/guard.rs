//! Access control guard for admin-only operations
//!
//! Purely claim-based: the admin flag baked into the access token at issuance
//! is trusted as-is and never re-read from the store. A demoted user keeps
//! admin access until their current access token expires.

use super::jwt::AccessClaims;
use super::middleware::AuthError;

/// True iff the claim set carries `admin: true`
pub fn is_admin(claims: &AccessClaims) -> bool {
    claims.admin
}

/// Fail with `Unauthorized` unless the caller is an admin
///
/// A missing or non-boolean `admin` claim never reaches this point; such
/// tokens fail to decode into [`AccessClaims`].
pub fn require_admin(claims: &AccessClaims) -> Result<(), AuthError> {
    if is_admin(claims) {
        Ok(())
    } else {
        Err(AuthError::NotAdmin)
    }
}

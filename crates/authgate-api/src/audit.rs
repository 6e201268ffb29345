//! Security audit logging for token lifecycle events
//!
//! Every event is logged at INFO level on the "audit" target so it can be
//! filtered and routed apart from request logs. Events carry identifiers
//! (user id, email, token id) but never secrets, password material or signed
//! token strings.
//!
//! Author: hephaex@gmail.com

use serde::{Deserialize, Serialize};
use tracing::info;

/// Security audit events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// New account created through the public register route
    Registration { user_id: i64, email: String },

    /// Credentials accepted and a token pair issued
    LoginSuccess {
        user_id: i64,
        email: String,
        refresh_uuid: String,
    },

    /// Credentials rejected; the reason is internal and never sent to the caller
    LoginFailure { email: String, reason: String },

    /// Access token minted from a refresh token
    TokenRefresh { user_id: i64, refresh_uuid: String },

    /// Refresh token presented but not accepted
    RefreshRejected { reason: String },

    /// Refresh token revoked by its holder
    Logout { user_id: i64, refresh_uuid: String },

    /// Valid bearer without the admin claim on an admin route
    AccessDenied { user_id: i64, resource: String },

    /// Missing, malformed, mis-signed or expired bearer token
    InvalidToken { resource: String, reason: String },

    /// Refresh token deleted by an administrator or the operator CLI
    RefreshTokenRevoked {
        refresh_uuid: String,
        revoked_by: Option<i64>,
    },
}

impl AuditEvent {
    fn message(&self) -> &'static str {
        match self {
            AuditEvent::Registration { .. } => "Registration successful",
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::TokenRefresh { .. } => "Token refresh",
            AuditEvent::RefreshRejected { .. } => "Refresh rejected",
            AuditEvent::Logout { .. } => "User logout",
            AuditEvent::AccessDenied { .. } => "Access denied",
            AuditEvent::InvalidToken { .. } => "Invalid token",
            AuditEvent::RefreshTokenRevoked { .. } => "Refresh token revoked",
        }
    }

    fn user_id(&self) -> Option<i64> {
        match self {
            AuditEvent::Registration { user_id, .. }
            | AuditEvent::LoginSuccess { user_id, .. }
            | AuditEvent::TokenRefresh { user_id, .. }
            | AuditEvent::Logout { user_id, .. }
            | AuditEvent::AccessDenied { user_id, .. } => Some(*user_id),
            AuditEvent::RefreshTokenRevoked { revoked_by, .. } => *revoked_by,
            _ => None,
        }
    }
}

/// Log a security audit event with structured fields
///
/// The whole event is also attached as JSON for log aggregators:
///
/// ```json
/// {"event_type":"login_success","user_id":1,"email":"a@b.com","refresh_uuid":"..."}
/// ```
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    info!(
        target: "audit",
        event = %event_json,
        user_id = ?event.user_id(),
        "{}",
        event.message()
    );
}

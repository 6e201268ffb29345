//! Claims codec: signed claim sets for access and refresh tokens
//!
//! Tokens are HS256 JWTs. Access and refresh tokens are signed with two
//! independent secrets, and the claim type decides which secret is used, so a
//! refresh token can never be verified with the access secret or vice versa.
//! This module is the only place that parses the signed representation;
//! everything downstream works with the typed claim structs.

use authgate_core::{AuthGateError, TokenConfig};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Which secret a claim set is signed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// A claim set the codec can sign and verify
pub trait TokenClaims: Serialize + DeserializeOwned {
    const KIND: TokenKind;

    /// Per-token unique identifier
    fn token_id(&self) -> &str;

    /// Absolute expiry, Unix seconds
    fn expires_at(&self) -> i64;
}

/// Access token claims
///
/// `admin` is copied from the user at issuance and trusted until the token
/// expires; it is not re-read from the store on each request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub authorized: bool,
    pub user_id: i64,
    pub admin: bool,
    pub access_uuid: String,
    pub exp: i64,
}

impl TokenClaims for AccessClaims {
    const KIND: TokenKind = TokenKind::Access;

    fn token_id(&self) -> &str {
        &self.access_uuid
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// Refresh token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub user_id: i64,
    pub admin: bool,
    pub refresh_uuid: String,
    pub exp: i64,
}

impl TokenClaims for RefreshClaims {
    const KIND: TokenKind = TokenKind::Refresh;

    fn token_id(&self) -> &str {
        &self.refresh_uuid
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// Token encoding and verification errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token contains an invalid number of segments")]
    InvalidSegmentCount,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("signature is invalid")]
    SignatureMismatch,

    #[error("unexpected signing method")]
    UnexpectedAlgorithm,

    #[error("token is expired")]
    Expired,

    #[error("missing {0:?} token secret")]
    MissingSecret(TokenKind),

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl JwtError {
    /// Signing failures point at a broken deployment, not a bad request
    pub fn is_configuration(&self) -> bool {
        matches!(self, JwtError::Signing(_) | JwtError::MissingSecret(_))
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidToken => JwtError::InvalidSegmentCount,
            ErrorKind::InvalidSignature => JwtError::SignatureMismatch,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                JwtError::UnexpectedAlgorithm
            }
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::MissingRequiredClaim(claim) => {
                JwtError::Malformed(format!("missing required claim `{claim}`"))
            }
            _ => JwtError::Malformed(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthGateError {
    fn from(err: JwtError) -> Self {
        if err.is_configuration() {
            AuthGateError::Configuration(err.to_string())
        } else {
            AuthGateError::Unauthorized(err.to_string())
        }
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is checked against an explicit clock in `check_expiry`
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);
    validation
}

fn check_expiry<C: TokenClaims>(claims: C, now: i64) -> Result<C, JwtError> {
    if now >= claims.expires_at() {
        return Err(JwtError::Expired);
    }
    Ok(claims)
}

/// Sign `claims` with `secret`
pub fn encode_claims<C: Serialize>(claims: &C, secret: &[u8]) -> Result<String, JwtError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(JwtError::Signing)
}

/// Verify `token` against `secret` and check it has not expired
pub fn decode_claims<C: TokenClaims>(token: &str, secret: &[u8]) -> Result<C, JwtError> {
    decode_claims_at(token, secret, Utc::now().timestamp())
}

/// As [`decode_claims`], with the current time supplied by the caller
pub fn decode_claims_at<C: TokenClaims>(
    token: &str,
    secret: &[u8],
    now: i64,
) -> Result<C, JwtError> {
    let data = decode::<C>(token, &DecodingKey::from_secret(secret), &validation())?;
    check_expiry(data.claims, now)
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn new(kind: TokenKind, secret: &str) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::MissingSecret(kind));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        })
    }
}

/// Holds both key pairs and picks one by claim type
pub struct ClaimsCodec {
    access: SigningKeys,
    refresh: SigningKeys,
}

impl ClaimsCodec {
    /// Build the codec from the token configuration
    ///
    /// Fails when either secret is empty.
    pub fn new(config: &TokenConfig) -> Result<Self, JwtError> {
        Ok(Self {
            access: SigningKeys::new(TokenKind::Access, &config.access_secret)?,
            refresh: SigningKeys::new(TokenKind::Refresh, &config.refresh_secret)?,
        })
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn encode<C: TokenClaims>(&self, claims: &C) -> Result<String, JwtError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.keys(C::KIND).encoding,
        )
        .map_err(JwtError::Signing)
    }

    pub fn decode<C: TokenClaims>(&self, token: &str) -> Result<C, JwtError> {
        self.decode_at(token, Utc::now().timestamp())
    }

    pub fn decode_at<C: TokenClaims>(&self, token: &str, now: i64) -> Result<C, JwtError> {
        let data = decode::<C>(token, &self.keys(C::KIND).decoding, &validation())?;
        check_expiry(data.claims, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS_SECRET: &str = "access-secret-for-tests";
    const REFRESH_SECRET: &str = "refresh-secret-for-tests";

    fn codec() -> ClaimsCodec {
        ClaimsCodec::new(&TokenConfig {
            access_secret: ACCESS_SECRET.to_string(),
            refresh_secret: REFRESH_SECRET.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn access_claims(exp: i64) -> AccessClaims {
        AccessClaims {
            authorized: true,
            user_id: 42,
            admin: true,
            access_uuid: "3f1c2a5e-access".to_string(),
            exp,
        }
    }

    fn refresh_claims(exp: i64) -> RefreshClaims {
        RefreshClaims {
            user_id: 7,
            admin: false,
            refresh_uuid: "9b7e0c1d-refresh".to_string(),
            exp,
        }
    }

    fn future() -> i64 {
        Utc::now().timestamp() + 600
    }

    #[test]
    fn test_round_trip() {
        let codec = codec();
        let claims = access_claims(future());

        let token = codec.encode(&claims).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let decoded: AccessClaims = codec.decode(&token).unwrap();
        assert_eq!(decoded, claims);

        let refresh = refresh_claims(future());
        let token = codec.encode(&refresh).unwrap();
        let decoded: RefreshClaims = codec.decode(&token).unwrap();
        assert_eq!(decoded, refresh);
    }

    #[test]
    fn test_wire_field_names() {
        let token = encode_claims(&refresh_claims(future()), REFRESH_SECRET.as_bytes()).unwrap();
        let decoded: serde_json::Value = {
            let data = decode::<serde_json::Value>(
                &token,
                &DecodingKey::from_secret(REFRESH_SECRET.as_bytes()),
                &validation(),
            )
            .unwrap();
            data.claims
        };

        assert!(decoded.get("refresh_uuid").is_some());
        assert!(decoded.get("user_id").is_some());
        assert!(decoded.get("admin").is_some());
        assert!(decoded.get("exp").is_some());
        assert!(decoded.get("authorized").is_none());
    }

    #[test]
    fn test_expired_token() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let token = codec.encode(&access_claims(now - 3600)).unwrap();

        let result = codec.decode::<AccessClaims>(&token);
        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_expiry_boundary() {
        let codec = codec();
        let exp = 1_000_000;
        let token = codec.encode(&access_claims(exp)).unwrap();

        assert!(codec.decode_at::<AccessClaims>(&token, exp - 1).is_ok());
        assert!(matches!(
            codec.decode_at::<AccessClaims>(&token, exp),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let token = encode_claims(&access_claims(future()), b"secret1").unwrap();
        let result = decode_claims::<AccessClaims>(&token, b"secret2");
        assert!(matches!(result, Err(JwtError::SignatureMismatch)));
    }

    #[test]
    fn test_wrong_secret_on_expired_payload_is_signature_error() {
        let now = Utc::now().timestamp();
        let token = encode_claims(&access_claims(now - 3600), b"secret1").unwrap();
        let result = decode_claims::<AccessClaims>(&token, b"secret2");
        assert!(matches!(result, Err(JwtError::SignatureMismatch)));
    }

    #[test]
    fn test_refresh_token_never_verifies_as_access() {
        let codec = codec();
        let refresh = codec.encode(&refresh_claims(future())).unwrap();

        // Same bytes, wrong secret for the kind
        let result = decode_claims::<RefreshClaims>(&refresh, ACCESS_SECRET.as_bytes());
        assert!(matches!(result, Err(JwtError::SignatureMismatch)));

        // Wrong kind through the codec: access secret, and the claim shape differs too
        assert!(codec.decode::<AccessClaims>(&refresh).is_err());
    }

    #[test]
    fn test_two_segments_is_malformed() {
        let codec = codec();
        let result = codec.decode::<AccessClaims>("eyJhbGciOiJIUzI1NiJ9.eyJleHAiOjF9");

        let err = result.unwrap_err();
        assert!(matches!(err, JwtError::InvalidSegmentCount));
        assert_eq!(err.to_string(), "token contains an invalid number of segments");
    }

    #[test]
    fn test_garbage_token() {
        let codec = codec();
        assert!(codec.decode::<AccessClaims>("invalid.token.here").is_err());
        assert!(codec.decode::<AccessClaims>("").is_err());
    }

    #[test]
    fn test_unexpected_algorithm() {
        let token = encode(
            &Header::new(Algorithm::HS512),
            &access_claims(future()),
            &EncodingKey::from_secret(ACCESS_SECRET.as_bytes()),
        )
        .unwrap();

        let result = codec().decode::<AccessClaims>(&token);
        assert!(matches!(result, Err(JwtError::UnexpectedAlgorithm)));
    }

    #[test]
    fn test_missing_admin_claim_rejected() {
        #[derive(Serialize)]
        struct NoAdmin {
            authorized: bool,
            user_id: i64,
            access_uuid: String,
            exp: i64,
        }

        let token = encode_claims(
            &NoAdmin {
                authorized: true,
                user_id: 1,
                access_uuid: "x".to_string(),
                exp: future(),
            },
            ACCESS_SECRET.as_bytes(),
        )
        .unwrap();

        let result = codec().decode::<AccessClaims>(&token);
        assert!(matches!(result, Err(JwtError::Malformed(_))));
    }

    #[test]
    fn test_missing_secret() {
        let result = ClaimsCodec::new(&TokenConfig {
            access_secret: "a".to_string(),
            refresh_secret: String::new(),
            ..Default::default()
        });
        let err = result.err().unwrap();
        assert!(matches!(err, JwtError::MissingSecret(TokenKind::Refresh)));
        assert!(err.is_configuration());
    }
}

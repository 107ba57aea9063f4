//! JWT access-token validation.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
#[cfg(any(feature = "issuer", test))]
use serde::Serialize;
use uuid::Uuid;

/// Profile identity extracted from a validated access token.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub profile_id: Uuid,
    pub expires_at: u64,
}

/// Errors returned by [`validate_access_token`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
}

/// Access-token claims payload.
///
/// | Field | JWT claim | Meaning |
/// |-------|-----------|---------|
/// | `sub` | `sub` | profile ID (UUID string) |
/// | `iat` | `iat` | issue time, seconds since epoch |
/// | `exp` | `exp` | expiration, seconds since epoch |
///
/// [`Serialize`] requires the **`issuer`** cargo feature; only the auth
/// service signs tokens.
#[derive(Debug, Deserialize)]
#[cfg_attr(any(feature = "issuer", test), derive(Serialize))]
pub struct AccessClaims {
    pub sub: String,
    #[serde(default)]
    pub iat: u64,
    pub exp: u64,
}

/// Decode and validate a JWT, returning raw claims.
///
/// HS256 only, `exp` and `sub` required, zero leeway: a token is rejected
/// the second its lifetime elapses.
fn decode_jwt(token: &str, secret: &str) -> Result<AccessClaims, AuthError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
        _ => AuthError::Malformed,
    })?;

    Ok(data.claims)
}

/// Validate a bearer access token, returning the embedded profile id.
pub fn validate_access_token(token: &str, secret: &str) -> Result<TokenInfo, AuthError> {
    let claims = decode_jwt(token, secret)?;
    let profile_id = claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| AuthError::Malformed)?;
    Ok(TokenInfo {
        profile_id,
        expires_at: claims.exp,
    })
}

/// Sign an HS256 access token for `profile_id`.
///
/// Requires the `issuer` feature.
#[cfg(any(feature = "issuer", test))]
pub fn sign_access_token(
    profile_id: Uuid,
    issued_at: u64,
    expires_at: u64,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = AccessClaims {
        sub: profile_id.to_string(),
        iat: issued_at,
        exp: expires_at,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
}

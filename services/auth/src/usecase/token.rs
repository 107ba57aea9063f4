use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngExt;
use uuid::Uuid;

use repassia_auth_types::token::{sign_access_token, validate_access_token};

use crate::config::AuthSettings;
use crate::domain::repository::{ProfileRepository, RefreshTokenRepository};
use crate::domain::types::{Profile, RefreshToken};
use crate::error::AuthServiceError;

/// Random bytes behind every opaque credential (256 bits).
const OPAQUE_TOKEN_BYTES: usize = 32;

/// 32 random bytes, base64url without padding (43 chars).
pub fn generate_opaque_token() -> String {
    let bytes: [u8; OPAQUE_TOKEN_BYTES] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A freshly signed access token and the instant it stops being accepted.
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub fn issue_access_token(
    profile_id: Uuid,
    secret: &str,
    ttl: chrono::Duration,
) -> Result<IssuedAccessToken, AuthServiceError> {
    let now = Utc::now();
    let expires_at = now + ttl;
    let token = sign_access_token(
        profile_id,
        now.timestamp() as u64,
        expires_at.timestamp() as u64,
        secret,
    )
    .map_err(|e| AuthServiceError::Internal(e.into()))?;
    Ok(IssuedAccessToken { token, expires_at })
}

/// Signature and expiry check. Every failure collapses to `InvalidToken`.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Uuid, AuthServiceError> {
    validate_access_token(token, secret)
        .map(|info| info.profile_id)
        .map_err(|_| AuthServiceError::InvalidToken)
}

pub async fn issue_refresh_token<R: RefreshTokenRepository>(
    refresh_tokens: &R,
    profile_id: Uuid,
    ttl: chrono::Duration,
) -> Result<String, AuthServiceError> {
    let now = Utc::now();
    let record = RefreshToken {
        id: Uuid::new_v4(),
        profile_id,
        token: generate_opaque_token(),
        expires_at: now + ttl,
        revoked: false,
        revoked_at: None,
        created_at: now,
    };
    refresh_tokens.create(&record).await?;
    Ok(record.token)
}

// ── RotateAccessToken (POST /auth/refresh) ───────────────────────────────────

#[derive(Debug)]
pub struct RotateAccessTokenOutput {
    pub profile: Profile,
    pub access_token: IssuedAccessToken,
}

/// Exchanges a refresh token for a new access token. The refresh token itself
/// stays valid until it expires or is revoked.
pub struct RotateAccessTokenUseCase<P: ProfileRepository, R: RefreshTokenRepository> {
    pub profiles: P,
    pub refresh_tokens: R,
    pub settings: Arc<AuthSettings>,
}

impl<P: ProfileRepository, R: RefreshTokenRepository> RotateAccessTokenUseCase<P, R> {
    pub async fn execute(
        &self,
        refresh_token: &str,
    ) -> Result<RotateAccessTokenOutput, AuthServiceError> {
        let stored = self
            .refresh_tokens
            .find_valid(refresh_token)
            .await?
            .ok_or(AuthServiceError::InvalidRefreshToken)?;

        let profile = self
            .profiles
            .find_by_id(stored.profile_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(AuthServiceError::ProfileInactive)?;

        let access_token = issue_access_token(
            profile.id,
            &self.settings.jwt_secret,
            self.settings.access_token_ttl,
        )?;
        self.profiles.touch_last_login(profile.id).await?;

        tracing::info!(profile_id = %profile.id, "access token refreshed");
        Ok(RotateAccessTokenOutput {
            profile,
            access_token,
        })
    }
}

// ── RevokeRefreshToken (POST /auth/revoke) ───────────────────────────────────

pub struct RevokeRefreshTokenUseCase<R: RefreshTokenRepository> {
    pub refresh_tokens: R,
}

impl<R: RefreshTokenRepository> RevokeRefreshTokenUseCase<R> {
    /// Unknown and already revoked tokens are not an error.
    pub async fn execute(&self, refresh_token: &str) -> Result<(), AuthServiceError> {
        if !self.refresh_tokens.revoke(refresh_token).await? {
            tracing::debug!("revoke matched no active refresh token");
        }
        Ok(())
    }
}

// ── RevokeAllRefreshTokens (POST /auth/revoke-all, auth-admin) ───────────────

pub struct RevokeAllRefreshTokensUseCase<R: RefreshTokenRepository> {
    pub refresh_tokens: R,
}

impl<R: RefreshTokenRepository> RevokeAllRefreshTokensUseCase<R> {
    pub async fn execute(&self, profile_id: Uuid) -> Result<u64, AuthServiceError> {
        let revoked = self
            .refresh_tokens
            .revoke_all_for_profile(profile_id)
            .await?;
        tracing::info!(%profile_id, revoked, "refresh tokens revoked");
        Ok(revoked)
    }
}

// ── ValidateFixedToken (POST /auth/validate-token) ───────────────────────────

pub struct ValidateFixedTokenUseCase<P: ProfileRepository> {
    pub profiles: P,
}

impl<P: ProfileRepository> ValidateFixedTokenUseCase<P> {
    pub async fn execute(&self, token: &str) -> Result<Profile, AuthServiceError> {
        let profile = self
            .profiles
            .find_active_by_fixed_token(token)
            .await?
            .ok_or(AuthServiceError::InvalidToken)?;
        self.profiles.touch_last_login(profile.id).await?;
        Ok(profile)
    }
}

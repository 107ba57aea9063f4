use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::RngExt;
use serde_json::json;
use uuid::Uuid;

use repassia_domain::otp::code_bounds;

use crate::config::AuthSettings;
use crate::domain::repository::{AuthCodeRepository, ProfileRepository, RefreshTokenRepository};
use crate::domain::types::{
    AUTH_CODE_REQUESTED, AUTHCODE_RATE_WINDOW_MINS, AuthCode, MAX_RECENT_AUTHCODES,
    OutboxEvent, Profile,
};
use crate::error::AuthServiceError;
use crate::usecase::token::{IssuedAccessToken, issue_access_token, issue_refresh_token};

/// Uniform random numeric code of `len` digits with a non-zero leading digit.
pub fn generate_code(len: u32) -> String {
    let (low, high) = code_bounds(len);
    rand::rng().random_range(low..=high).to_string()
}

// ── RequestCode (POST /auth/request-code) ────────────────────────────────────

pub struct RequestCodeInput {
    /// Normalized email address.
    pub email: String,
}

#[derive(Debug)]
pub struct RequestCodeOutput {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub profile_name: String,
}

pub struct RequestCodeUseCase<P, A>
where
    P: ProfileRepository,
    A: AuthCodeRepository,
{
    pub profiles: P,
    pub auth_codes: A,
    pub settings: Arc<AuthSettings>,
}

impl<P, A> RequestCodeUseCase<P, A>
where
    P: ProfileRepository,
    A: AuthCodeRepository,
{
    pub async fn execute(
        &self,
        input: RequestCodeInput,
    ) -> Result<RequestCodeOutput, AuthServiceError> {
        // 1. Only active profiles may receive codes
        let profile = self
            .profiles
            .find_by_email(&input.email)
            .await?
            .filter(|p| p.is_active)
            .ok_or(AuthServiceError::NotFoundOrInactive)?;

        // 2. Code row + email outbox event, bounded by the rolling-window limit
        let now = Utc::now();
        let since = now - Duration::minutes(AUTHCODE_RATE_WINDOW_MINS);
        let code = AuthCode {
            id: Uuid::new_v4(),
            email: input.email.clone(),
            code: generate_code(self.settings.code_length),
            expires_at: now + self.settings.code_ttl,
            used: false,
            created_at: now,
        };
        let event = OutboxEvent {
            id: Uuid::new_v4(),
            aggregate_id: code.id,
            kind: AUTH_CODE_REQUESTED.to_owned(),
            payload: json!({
                "email": code.email,
                "name": profile.name,
                "code": code.code,
                "expires_at": code.expires_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            }),
            idempotency_key: format!("{AUTH_CODE_REQUESTED}:{}", code.id),
        };
        let created = self
            .auth_codes
            .create_within_limit(&code, &event, since, MAX_RECENT_AUTHCODES)
            .await?;
        if !created {
            tracing::warn!(profile_id = %profile.id, "authcode rate limit reached");
            return Err(AuthServiceError::RateLimited);
        }

        tracing::info!(profile_id = %profile.id, "authcode issued");
        Ok(RequestCodeOutput {
            code: code.code,
            expires_at: code.expires_at,
            profile_name: profile.name,
        })
    }
}

// ── VerifyCode (POST /auth/verify-code) ──────────────────────────────────────

pub struct VerifyCodeInput {
    /// Normalized email address.
    pub email: String,
    pub code: String,
}

#[derive(Debug)]
pub struct VerifyCodeOutput {
    pub profile: Profile,
    pub access_token: IssuedAccessToken,
    pub refresh_token: String,
}

pub struct VerifyCodeUseCase<P, A, R>
where
    P: ProfileRepository,
    A: AuthCodeRepository,
    R: RefreshTokenRepository,
{
    pub profiles: P,
    pub auth_codes: A,
    pub refresh_tokens: R,
    pub settings: Arc<AuthSettings>,
}

impl<P, A, R> VerifyCodeUseCase<P, A, R>
where
    P: ProfileRepository,
    A: AuthCodeRepository,
    R: RefreshTokenRepository,
{
    pub async fn execute(
        &self,
        input: VerifyCodeInput,
    ) -> Result<VerifyCodeOutput, AuthServiceError> {
        let auth_code = self
            .auth_codes
            .find_latest_valid(&input.email, &input.code)
            .await?
            .ok_or(AuthServiceError::InvalidOrExpired)?;

        // Losing a concurrent redemption looks the same as an unknown code.
        if !self.auth_codes.mark_used(auth_code.id).await? {
            return Err(AuthServiceError::InvalidOrExpired);
        }

        let profile = self
            .profiles
            .find_by_email(&auth_code.email)
            .await?
            .filter(|p| p.is_active)
            .ok_or(AuthServiceError::ProfileInactive)?;

        self.profiles.touch_last_login(profile.id).await?;

        let access_token = issue_access_token(
            profile.id,
            &self.settings.jwt_secret,
            self.settings.access_token_ttl,
        )?;
        let refresh_token = issue_refresh_token(
            &self.refresh_tokens,
            profile.id,
            self.settings.refresh_token_ttl,
        )
        .await?;

        tracing::info!(profile_id = %profile.id, "login completed");
        Ok(VerifyCodeOutput {
            profile,
            access_token,
            refresh_token,
        })
    }
}

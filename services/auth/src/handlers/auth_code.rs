use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use repassia_domain::otp::is_well_formed;

use crate::domain::repository::CredentialStore;
use crate::domain::types::ProfileSummary;
use crate::error::AuthServiceError;
use crate::handlers::{ValidJson, valid_email};
use crate::rate_limit::RateLimitAction;
use crate::state::AppState;
use crate::usecase::authcode::{
    RequestCodeInput, RequestCodeUseCase, VerifyCodeInput, VerifyCodeUseCase,
};

// ── POST /auth/request-code ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RequestCodeRequest {
    pub email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCodeResponse {
    pub message: &'static str,
    #[serde(serialize_with = "repassia_core::serde::to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
}

pub async fn request_code<S: CredentialStore>(
    State(state): State<AppState<S>>,
    ValidJson(body): ValidJson<RequestCodeRequest>,
) -> Result<Json<RequestCodeResponse>, AuthServiceError> {
    let email = valid_email(&body.email)?;

    let usecase = RequestCodeUseCase {
        profiles: state.store.profiles(),
        auth_codes: state.store.auth_codes(),
        settings: state.settings.clone(),
    };
    let out = usecase.execute(RequestCodeInput { email }).await?;

    Ok(Json(RequestCodeResponse {
        message: "verification code sent",
        expires_at: out.expires_at,
    }))
}

// ── POST /auth/verify-code ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeResponse {
    pub access_token: String,
    #[serde(serialize_with = "repassia_core::serde::to_rfc3339_ms")]
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub profile: ProfileSummary,
}

pub async fn verify_code<S: CredentialStore>(
    State(state): State<AppState<S>>,
    ValidJson(body): ValidJson<VerifyCodeRequest>,
) -> Result<Json<VerifyCodeResponse>, AuthServiceError> {
    let email = valid_email(&body.email)?;
    let code = body.code.trim();
    if !is_well_formed(code, state.settings.code_length) {
        return Err(AuthServiceError::Validation(format!(
            "code must be {} digits",
            state.settings.code_length
        )));
    }
    if !state.throttle.allow_email(&email, RateLimitAction::VerifyCode) {
        tracing::warn!("code verification throttled");
        return Err(AuthServiceError::RateLimited);
    }

    let usecase = VerifyCodeUseCase {
        profiles: state.store.profiles(),
        auth_codes: state.store.auth_codes(),
        refresh_tokens: state.store.refresh_tokens(),
        settings: state.settings.clone(),
    };
    let out = usecase
        .execute(VerifyCodeInput {
            email,
            code: code.to_owned(),
        })
        .await?;

    Ok(Json(VerifyCodeResponse {
        access_token: out.access_token.token,
        access_token_expires_at: out.access_token.expires_at,
        refresh_token: out.refresh_token,
        profile: ProfileSummary::from(&out.profile),
    }))
}

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::repository::CredentialStore;
use crate::domain::types::ProfileSummary;
use crate::error::AuthServiceError;
use crate::handlers::{MessageResponse, ValidJson, non_empty};
use crate::state::AppState;
use crate::usecase::token::{
    RevokeRefreshTokenUseCase, RotateAccessTokenUseCase, ValidateFixedTokenUseCase,
};

#[derive(Serialize)]
pub struct ProfileResponse {
    pub profile: ProfileSummary,
}

// ── POST /auth/validate-token ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ValidateTokenRequest {
    pub token: String,
}

pub async fn validate_token<S: CredentialStore>(
    State(state): State<AppState<S>>,
    ValidJson(body): ValidJson<ValidateTokenRequest>,
) -> Result<Json<ProfileResponse>, AuthServiceError> {
    let token = non_empty(&body.token, "token")?;

    let usecase = ValidateFixedTokenUseCase {
        profiles: state.store.profiles(),
    };
    let profile = usecase.execute(token).await?;

    Ok(Json(ProfileResponse {
        profile: ProfileSummary::from(&profile),
    }))
}

// ── POST /auth/refresh ────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(serialize_with = "repassia_core::serde::to_rfc3339_ms")]
    pub access_token_expires_at: DateTime<Utc>,
    pub profile: ProfileSummary,
}

pub async fn refresh<S: CredentialStore>(
    State(state): State<AppState<S>>,
    ValidJson(body): ValidJson<RefreshTokenRequest>,
) -> Result<Json<RefreshResponse>, AuthServiceError> {
    let refresh_token = non_empty(&body.refresh_token, "refreshToken")?;

    let usecase = RotateAccessTokenUseCase {
        profiles: state.store.profiles(),
        refresh_tokens: state.store.refresh_tokens(),
        settings: state.settings.clone(),
    };
    let out = usecase.execute(refresh_token).await?;

    Ok(Json(RefreshResponse {
        access_token: out.access_token.token,
        access_token_expires_at: out.access_token.expires_at,
        profile: ProfileSummary::from(&out.profile),
    }))
}

// ── POST /auth/revoke ─────────────────────────────────────────────────────────

pub async fn revoke<S: CredentialStore>(
    State(state): State<AppState<S>>,
    ValidJson(body): ValidJson<RefreshTokenRequest>,
) -> Result<Json<MessageResponse>, AuthServiceError> {
    let refresh_token = non_empty(&body.refresh_token, "refreshToken")?;

    let usecase = RevokeRefreshTokenUseCase {
        refresh_tokens: state.store.refresh_tokens(),
    };
    usecase.execute(refresh_token).await?;

    Ok(Json(MessageResponse {
        message: "refresh token revoked",
    }))
}

//! Routes behind the auth gateway.

use axum::{Json, extract::State};
use serde::Serialize;

use repassia_auth_types::identity::{AuthMode, Identity};

use crate::domain::repository::{CredentialStore, ProfileRepository};
use crate::domain::types::ProfileSummary;
use crate::error::AuthServiceError;
use crate::state::AppState;
use crate::usecase::token::RevokeAllRefreshTokensUseCase;

// ── GET /auth/me ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct MeResponse {
    pub profile: ProfileSummary,
    pub mode: AuthMode,
}

pub async fn me<S: CredentialStore>(
    State(state): State<AppState<S>>,
    identity: Identity,
) -> Result<Json<MeResponse>, AuthServiceError> {
    let profile = state
        .store
        .profiles()
        .find_by_id(identity.profile_id)
        .await?
        .ok_or(AuthServiceError::InvalidToken)?;

    Ok(Json(MeResponse {
        profile: ProfileSummary::from(&profile),
        mode: identity.mode,
    }))
}

// ── POST /auth/revoke-all ─────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct RevokeAllResponse {
    pub revoked: u64,
}

pub async fn revoke_all<S: CredentialStore>(
    State(state): State<AppState<S>>,
    identity: Identity,
) -> Result<Json<RevokeAllResponse>, AuthServiceError> {
    let usecase = RevokeAllRefreshTokensUseCase {
        refresh_tokens: state.store.refresh_tokens(),
    };
    let revoked = usecase.execute(identity.profile_id).await?;
    Ok(Json(RevokeAllResponse { revoked }))
}

use chrono::{Duration, Utc};

use crate::domain::repository::{AuthCodeRepository, RefreshTokenRepository};
use crate::domain::types::REVOKED_TOKEN_RETENTION_DAYS;
use crate::error::AuthServiceError;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub auth_codes: u64,
    pub refresh_tokens: u64,
}

/// Deletes expired auth codes, expired refresh tokens, and refresh tokens
/// revoked longer ago than the retention window.
pub struct PurgeExpiredCredentialsUseCase<A: AuthCodeRepository, R: RefreshTokenRepository> {
    pub auth_codes: A,
    pub refresh_tokens: R,
}

impl<A: AuthCodeRepository, R: RefreshTokenRepository> PurgeExpiredCredentialsUseCase<A, R> {
    pub async fn execute(&self) -> Result<PurgeReport, AuthServiceError> {
        let now = Utc::now();
        let auth_codes = self.auth_codes.delete_expired(now).await?;
        let refresh_tokens = self
            .refresh_tokens
            .delete_stale(now, now - Duration::days(REVOKED_TOKEN_RETENTION_DAYS))
            .await?;

        tracing::info!(auth_codes, refresh_tokens, "expired credentials purged");
        Ok(PurgeReport {
            auth_codes,
            refresh_tokens,
        })
    }
}

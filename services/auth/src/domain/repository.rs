//! Credential store ports.
//!
//! Methods return `Send` futures so use cases can run inside boxed
//! middleware futures; implementors still write plain `async fn`.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::types::{AuthCode, OutboxEvent, Profile, RefreshToken};
use crate::error::AuthServiceError;

pub trait ProfileRepository: Send + Sync {
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<Profile>, AuthServiceError>> + Send;

    fn find_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Profile>, AuthServiceError>> + Send;

    /// Exact fixed-token match restricted to active profiles.
    fn find_active_by_fixed_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<Profile>, AuthServiceError>> + Send;

    /// Stamp `last_login_at = now` on an active profile.
    /// Returns `false` when no active profile has this id.
    fn touch_last_login(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<bool, AuthServiceError>> + Send;

    fn create(&self, profile: &Profile)
    -> impl Future<Output = Result<(), AuthServiceError>> + Send;

    /// Returns `false` when the profile does not exist.
    fn set_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> impl Future<Output = Result<bool, AuthServiceError>> + Send;
}

pub trait AuthCodeRepository: Send + Sync {
    /// Insert a new auth code and its outbox event in one transaction, unless
    /// `code.email` already has `max_recent` unused codes created at or after
    /// `since`. The count and the insert are serialized per email; returns
    /// `false` and writes nothing when the limit is reached.
    fn create_within_limit(
        &self,
        code: &AuthCode,
        event: &OutboxEvent,
        since: DateTime<Utc>,
        max_recent: u64,
    ) -> impl Future<Output = Result<bool, AuthServiceError>> + Send;

    /// Newest unused, unexpired code matching `email` and `code`.
    fn find_latest_valid(
        &self,
        email: &str,
        code: &str,
    ) -> impl Future<Output = Result<Option<AuthCode>, AuthServiceError>> + Send;

    /// Flip `used` from false to true. Returns `true` only for the caller whose
    /// update changed the row; a concurrent second caller gets `false`.
    fn mark_used(&self, id: Uuid) -> impl Future<Output = Result<bool, AuthServiceError>> + Send;

    fn delete_expired(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, AuthServiceError>> + Send;
}

pub trait RefreshTokenRepository: Send + Sync {
    fn create(
        &self,
        token: &RefreshToken,
    ) -> impl Future<Output = Result<(), AuthServiceError>> + Send;

    /// Unrevoked, unexpired token with this exact value.
    fn find_valid(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<RefreshToken>, AuthServiceError>> + Send;

    /// Revoke an unrevoked token. Returns `false` for unknown or already revoked values.
    fn revoke(&self, token: &str) -> impl Future<Output = Result<bool, AuthServiceError>> + Send;

    /// Revoke every unrevoked token of a profile, returning how many changed.
    fn revoke_all_for_profile(
        &self,
        profile_id: Uuid,
    ) -> impl Future<Output = Result<u64, AuthServiceError>> + Send;

    /// Delete expired tokens and tokens revoked before `revoked_before`.
    fn delete_stale(
        &self,
        now: DateTime<Utc>,
        revoked_before: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, AuthServiceError>> + Send;
}

/// Hands out the repositories a request needs and reports whether the
/// backing store is reachable.
pub trait CredentialStore: Clone + Send + Sync + 'static {
    type Profiles: ProfileRepository + Clone + 'static;
    type AuthCodes: AuthCodeRepository + 'static;
    type RefreshTokens: RefreshTokenRepository + 'static;

    fn profiles(&self) -> Self::Profiles;

    fn auth_codes(&self) -> Self::AuthCodes;

    fn refresh_tokens(&self) -> Self::RefreshTokens;

    fn ping(&self) -> impl Future<Output = bool> + Send;
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Staff or service identity allowed to authenticate.
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    /// Permanent machine credential. Never expires; only `is_active` gates it.
    pub fixed_token: String,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a profile returned by login and token endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<&Profile> for ProfileSummary {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            email: profile.email.clone(),
            name: profile.name.clone(),
        }
    }
}

/// One-time numeric login code bound to an email address.
#[derive(Debug, Clone)]
pub struct AuthCode {
    pub id: Uuid,
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl AuthCode {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }
}

/// Opaque session-continuation credential.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// Outbox event for async delivery (login-code email).
#[derive(Debug, Clone)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub idempotency_key: String,
}

/// Outbox kind consumed by the mail worker.
pub const AUTH_CODE_REQUESTED: &str = "auth_code_requested";

/// Unused codes allowed per email inside the rate window.
pub const MAX_RECENT_AUTHCODES: u64 = 3;

/// Rolling window for the code request limit, in minutes.
pub const AUTHCODE_RATE_WINDOW_MINS: i64 = 15;

/// How long revoked refresh tokens are kept before purge, in days.
pub const REVOKED_TOKEN_RETENTION_DAYS: i64 = 7;

/// Prefix of generated fixed service tokens.
pub const FIXED_TOKEN_PREFIX: &str = "svc_";

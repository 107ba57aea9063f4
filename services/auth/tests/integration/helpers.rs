use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use repassia_auth::config::AuthSettings;
use repassia_auth::domain::repository::{
    AuthCodeRepository, CredentialStore, ProfileRepository, RefreshTokenRepository,
};
use repassia_auth::domain::types::{AuthCode, OutboxEvent, Profile, RefreshToken};
use repassia_auth::error::AuthServiceError;

pub use repassia_testing::auth::TEST_JWT_SECRET;

// ── MockProfileRepo ──────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockProfileRepo {
    pub profiles: Arc<Mutex<Vec<Profile>>>,
}

impl MockProfileRepo {
    pub fn new(profiles: Vec<Profile>) -> Self {
        Self {
            profiles: Arc::new(Mutex::new(profiles)),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Uuid) -> Option<Profile> {
        self.profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn deactivate(&self, id: Uuid) {
        let mut profiles = self.profiles.lock().unwrap();
        if let Some(p) = profiles.iter_mut().find(|p| p.id == id) {
            p.is_active = false;
        }
    }
}

impl ProfileRepository for MockProfileRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, AuthServiceError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, AuthServiceError> {
        Ok(self.get(id))
    }

    async fn find_active_by_fixed_token(
        &self,
        token: &str,
    ) -> Result<Option<Profile>, AuthServiceError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.fixed_token == token && p.is_active)
            .cloned())
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<bool, AuthServiceError> {
        let mut profiles = self.profiles.lock().unwrap();
        match profiles.iter_mut().find(|p| p.id == id && p.is_active) {
            Some(p) => {
                p.last_login_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create(&self, profile: &Profile) -> Result<(), AuthServiceError> {
        let mut profiles = self.profiles.lock().unwrap();
        if profiles
            .iter()
            .any(|p| p.email == profile.email || p.fixed_token == profile.fixed_token)
        {
            return Err(AuthServiceError::ProfileAlreadyExists);
        }
        profiles.push(profile.clone());
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, AuthServiceError> {
        let mut profiles = self.profiles.lock().unwrap();
        match profiles.iter_mut().find(|p| p.id == id) {
            Some(p) => {
                p.is_active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ── MockAuthCodeRepo ─────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockAuthCodeRepo {
    pub codes: Arc<Mutex<Vec<AuthCode>>>,
    pub events: Arc<Mutex<Vec<OutboxEvent>>>,
    /// Return codes from `find_latest_valid` even after they were used, as a
    /// reader racing a concurrent redemption would.
    pub stale_reads: bool,
}

impl MockAuthCodeRepo {
    pub fn new(codes: Vec<AuthCode>) -> Self {
        Self {
            codes: Arc::new(Mutex::new(codes)),
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_stale_reads(mut self) -> Self {
        self.stale_reads = true;
        self
    }
}

impl AuthCodeRepository for MockAuthCodeRepo {
    async fn create_within_limit(
        &self,
        code: &AuthCode,
        event: &OutboxEvent,
        since: DateTime<Utc>,
        max_recent: u64,
    ) -> Result<bool, AuthServiceError> {
        let mut codes = self.codes.lock().unwrap();
        let recent = codes
            .iter()
            .filter(|c| c.email == code.email && !c.used && c.created_at >= since)
            .count() as u64;
        if recent >= max_recent {
            return Ok(false);
        }
        codes.push(code.clone());
        self.events.lock().unwrap().push(event.clone());
        Ok(true)
    }

    async fn find_latest_valid(
        &self,
        email: &str,
        code: &str,
    ) -> Result<Option<AuthCode>, AuthServiceError> {
        let now = Utc::now();
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.email == email && c.code == code)
            .filter(|c| c.expires_at > now && (self.stale_reads || !c.used))
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn mark_used(&self, id: Uuid) -> Result<bool, AuthServiceError> {
        let mut codes = self.codes.lock().unwrap();
        match codes.iter_mut().find(|c| c.id == id && !c.used) {
            Some(c) => {
                c.used = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthServiceError> {
        let mut codes = self.codes.lock().unwrap();
        let before = codes.len();
        codes.retain(|c| c.expires_at > now);
        Ok((before - codes.len()) as u64)
    }
}

// ── MockRefreshTokenRepo ─────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockRefreshTokenRepo {
    pub tokens: Arc<Mutex<Vec<RefreshToken>>>,
}

impl MockRefreshTokenRepo {
    pub fn new(tokens: Vec<RefreshToken>) -> Self {
        Self {
            tokens: Arc::new(Mutex::new(tokens)),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn find(&self, token: &str) -> Option<RefreshToken> {
        self.tokens
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.token == token)
            .cloned()
    }
}

impl RefreshTokenRepository for MockRefreshTokenRepo {
    async fn create(&self, token: &RefreshToken) -> Result<(), AuthServiceError> {
        self.tokens.lock().unwrap().push(token.clone());
        Ok(())
    }

    async fn find_valid(&self, token: &str) -> Result<Option<RefreshToken>, AuthServiceError> {
        let now = Utc::now();
        Ok(self.find(token).filter(|t| t.is_valid_at(now)))
    }

    async fn revoke(&self, token: &str) -> Result<bool, AuthServiceError> {
        let mut tokens = self.tokens.lock().unwrap();
        match tokens.iter_mut().find(|t| t.token == token && !t.revoked) {
            Some(t) => {
                t.revoked = true;
                t.revoked_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_all_for_profile(&self, profile_id: Uuid) -> Result<u64, AuthServiceError> {
        let now = Utc::now();
        let mut revoked = 0;
        for t in self
            .tokens
            .lock()
            .unwrap()
            .iter_mut()
            .filter(|t| t.profile_id == profile_id && !t.revoked)
        {
            t.revoked = true;
            t.revoked_at = Some(now);
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn delete_stale(
        &self,
        now: DateTime<Utc>,
        revoked_before: DateTime<Utc>,
    ) -> Result<u64, AuthServiceError> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|t| {
            let expired = t.expires_at <= now;
            let long_revoked = t.revoked && t.revoked_at.is_some_and(|at| at < revoked_before);
            !(expired || long_revoked)
        });
        Ok((before - tokens.len()) as u64)
    }
}

/// Refresh token store whose every call fails like a dropped connection.
#[derive(Clone, Default)]
pub struct FailingRefreshTokenRepo;

impl RefreshTokenRepository for FailingRefreshTokenRepo {
    async fn create(&self, _token: &RefreshToken) -> Result<(), AuthServiceError> {
        Err(anyhow::anyhow!("connection refused").into())
    }

    async fn find_valid(&self, _token: &str) -> Result<Option<RefreshToken>, AuthServiceError> {
        Err(anyhow::anyhow!("connection refused").into())
    }

    async fn revoke(&self, _token: &str) -> Result<bool, AuthServiceError> {
        Err(anyhow::anyhow!("connection refused").into())
    }

    async fn revoke_all_for_profile(&self, _profile_id: Uuid) -> Result<u64, AuthServiceError> {
        Err(anyhow::anyhow!("connection refused").into())
    }

    async fn delete_stale(
        &self,
        _now: DateTime<Utc>,
        _revoked_before: DateTime<Utc>,
    ) -> Result<u64, AuthServiceError> {
        Err(anyhow::anyhow!("connection refused").into())
    }
}

// ── MockStore ────────────────────────────────────────────────────────────────

/// In-memory credential store; clones share the same rows.
#[derive(Clone, Default)]
pub struct MockStore {
    pub profiles: MockProfileRepo,
    pub auth_codes: MockAuthCodeRepo,
    pub refresh_tokens: MockRefreshTokenRepo,
}

impl MockStore {
    pub fn with_profiles(profiles: Vec<Profile>) -> Self {
        Self {
            profiles: MockProfileRepo::new(profiles),
            ..Self::default()
        }
    }
}

impl CredentialStore for MockStore {
    type Profiles = MockProfileRepo;
    type AuthCodes = MockAuthCodeRepo;
    type RefreshTokens = MockRefreshTokenRepo;

    fn profiles(&self) -> MockProfileRepo {
        self.profiles.clone()
    }

    fn auth_codes(&self) -> MockAuthCodeRepo {
        self.auth_codes.clone()
    }

    fn refresh_tokens(&self) -> MockRefreshTokenRepo {
        self.refresh_tokens.clone()
    }

    async fn ping(&self) -> bool {
        true
    }
}

// ── Test fixture helpers ─────────────────────────────────────────────────────

pub fn test_settings() -> Arc<AuthSettings> {
    Arc::new(AuthSettings::new(TEST_JWT_SECRET))
}

pub fn test_profile() -> Profile {
    let now = Utc::now();
    Profile {
        id: Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap(),
        email: "staff@example.com".to_owned(),
        name: "Staff Member".to_owned(),
        fixed_token: "svc_test-fixed-token".to_owned(),
        is_active: true,
        last_login_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn other_profile() -> Profile {
    Profile {
        id: Uuid::parse_str("00000000-0000-0000-0000-000000000002").unwrap(),
        email: "robot@example.com".to_owned(),
        name: "Inventory Sync".to_owned(),
        fixed_token: "svc_other-fixed-token".to_owned(),
        ..test_profile()
    }
}

pub fn test_auth_code(email: &str, code: &str) -> AuthCode {
    let now = Utc::now();
    AuthCode {
        id: Uuid::new_v4(),
        email: email.to_owned(),
        code: code.to_owned(),
        expires_at: now + Duration::minutes(15),
        used: false,
        created_at: now,
    }
}

/// Refresh token issued `age` ago with the default 7 day lifetime.
pub fn test_refresh_token(profile_id: Uuid, value: &str, age: Duration) -> RefreshToken {
    let created_at = Utc::now() - age;
    RefreshToken {
        id: Uuid::new_v4(),
        profile_id,
        token: value.to_owned(),
        expires_at: created_at + Duration::days(7),
        revoked: false,
        revoked_at: None,
        created_at,
    }
}

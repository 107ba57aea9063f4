//! Credential helpers for tests.
//!
//! Mint access tokens signed with a known secret and build the
//! `Authorization` headers a real client would send.

use std::time::{SystemTime, UNIX_EPOCH};

use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue};
use uuid::Uuid;

use repassia_auth_types::token::sign_access_token;

/// Signing secret shared by service tests.
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-for-unit-tests-only";

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Builds signed access tokens for a profile.
pub struct MockSession {
    pub profile_id: Uuid,
    pub secret: String,
}

impl MockSession {
    pub fn new(profile_id: Uuid) -> Self {
        Self {
            profile_id,
            secret: TEST_JWT_SECRET.to_owned(),
        }
    }

    /// Token valid for `ttl_secs` from now.
    pub fn access_token(&self, ttl_secs: u64) -> String {
        let now = now_secs();
        sign_access_token(self.profile_id, now, now + ttl_secs, &self.secret).unwrap()
    }

    /// Token whose lifetime ended `ago_secs` seconds in the past.
    pub fn expired_access_token(&self, ago_secs: u64) -> String {
        let now = now_secs();
        sign_access_token(
            self.profile_id,
            now - ago_secs - 900,
            now - ago_secs,
            &self.secret,
        )
        .unwrap()
    }
}

/// `Authorization: Bearer <token>` as a header map.
pub fn bearer_headers(token: &str) -> HeaderMap {
    let mut map = HeaderMap::new();
    map.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    map
}

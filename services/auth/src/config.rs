use std::fmt;
use std::time::Duration;

use anyhow::{Context as _, ensure};
use serde::Deserialize;

use repassia_core::config::Config;
use repassia_core::tracing::LogFormat;
use repassia_domain::otp::{CODE_LENGTH_RANGE, DEFAULT_CODE_LENGTH};

use crate::rate_limit::{AuthThrottle, RateLimitPolicy, WindowRateLimiter};

/// Auth service configuration loaded from environment variables.
#[derive(Deserialize)]
pub struct AuthConfig {
    /// PostgreSQL connection URL. Env var: `DATABASE_URL`.
    pub database_url: String,
    /// HMAC secret for signing access tokens. Env var: `JWT_SECRET`.
    pub jwt_secret: String,
    /// TCP port to listen on. Env var: `PORT`.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Digits per login code. Env var: `AUTH_CODE_LENGTH`.
    #[serde(default = "default_code_length")]
    pub auth_code_length: u32,
    /// Login code lifetime in minutes. Env var: `AUTH_CODE_EXPIRATION`.
    #[serde(default = "default_code_expiration")]
    pub auth_code_expiration: u32,
    /// Access token lifetime, e.g. `15m`. Env var: `JWT_EXPIRATION`.
    #[serde(
        with = "repassia_core::serde::humantime",
        default = "default_jwt_expiration"
    )]
    pub jwt_expiration: Duration,
    /// Refresh token lifetime, e.g. `7d`. Env var: `REFRESH_TOKEN_EXPIRATION`.
    #[serde(
        with = "repassia_core::serde::humantime",
        default = "default_refresh_token_expiration"
    )]
    pub refresh_token_expiration: Duration,
    /// Comma-separated CORS origins; `*` allows any. Env var: `ALLOWED_ORIGINS`.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Public `/auth` requests allowed per client address and window.
    /// Env var: `AUTH_RATE_LIMIT`.
    #[serde(default = "default_auth_rate_limit")]
    pub auth_rate_limit: u32,
    /// Window for `AUTH_RATE_LIMIT`, e.g. `1m`. Env var: `AUTH_RATE_WINDOW`.
    #[serde(
        with = "repassia_core::serde::humantime",
        default = "default_auth_rate_window"
    )]
    pub auth_rate_window: Duration,
    /// Code redemption attempts allowed per email within one code lifetime.
    /// Env var: `VERIFY_ATTEMPT_LIMIT`.
    #[serde(default = "default_verify_attempt_limit")]
    pub verify_attempt_limit: u32,
    /// Take the client address from `X-Forwarded-For`. Env var: `TRUST_PROXY`.
    #[serde(default)]
    pub trust_proxy: bool,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Config for AuthConfig {}

fn default_port() -> u16 {
    8080
}

fn default_code_length() -> u32 {
    DEFAULT_CODE_LENGTH
}

fn default_code_expiration() -> u32 {
    15
}

fn default_jwt_expiration() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_refresh_token_expiration() -> Duration {
    Duration::from_secs(7 * 24 * 60 * 60)
}

fn default_auth_rate_limit() -> u32 {
    5
}

fn default_auth_rate_window() -> Duration {
    Duration::from_secs(60)
}

fn default_verify_attempt_limit() -> u32 {
    5
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_owned()]
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("port", &self.port)
            .field("auth_code_length", &self.auth_code_length)
            .field("auth_code_expiration", &self.auth_code_expiration)
            .field("jwt_expiration", &self.jwt_expiration)
            .field("refresh_token_expiration", &self.refresh_token_expiration)
            .field("allowed_origins", &self.allowed_origins)
            .field("auth_rate_limit", &self.auth_rate_limit)
            .field("auth_rate_window", &self.auth_rate_window)
            .field("verify_attempt_limit", &self.verify_attempt_limit)
            .field("trust_proxy", &self.trust_proxy)
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

impl AuthConfig {
    /// Validate the raw values and convert them into the typed settings used
    /// by the login and token use cases.
    pub fn auth_settings(&self) -> anyhow::Result<AuthSettings> {
        ensure!(!self.jwt_secret.trim().is_empty(), "JWT_SECRET must not be empty");
        ensure!(
            CODE_LENGTH_RANGE.contains(&self.auth_code_length),
            "AUTH_CODE_LENGTH must be between {} and {}",
            CODE_LENGTH_RANGE.start(),
            CODE_LENGTH_RANGE.end()
        );
        ensure!(
            self.auth_code_expiration > 0,
            "AUTH_CODE_EXPIRATION must be positive"
        );
        ensure!(
            !self.jwt_expiration.is_zero(),
            "JWT_EXPIRATION must be positive"
        );
        ensure!(
            !self.refresh_token_expiration.is_zero(),
            "REFRESH_TOKEN_EXPIRATION must be positive"
        );

        Ok(AuthSettings {
            jwt_secret: self.jwt_secret.clone(),
            code_length: self.auth_code_length,
            code_ttl: chrono::Duration::minutes(i64::from(self.auth_code_expiration)),
            access_token_ttl: chrono::Duration::from_std(self.jwt_expiration)
                .context("JWT_EXPIRATION out of range")?,
            refresh_token_ttl: chrono::Duration::from_std(self.refresh_token_expiration)
                .context("REFRESH_TOKEN_EXPIRATION out of range")?,
        })
    }
}

impl AuthConfig {
    /// Build the request throttle for the public login routes.
    pub fn throttle(&self) -> anyhow::Result<AuthThrottle> {
        ensure!(self.auth_rate_limit > 0, "AUTH_RATE_LIMIT must be positive");
        ensure!(
            !self.auth_rate_window.is_zero(),
            "AUTH_RATE_WINDOW must be positive"
        );
        ensure!(
            self.verify_attempt_limit > 0,
            "VERIFY_ATTEMPT_LIMIT must be positive"
        );

        let per_ip = RateLimitPolicy {
            max: self.auth_rate_limit,
            window: self.auth_rate_window,
        };
        let per_email = RateLimitPolicy {
            max: self.verify_attempt_limit,
            window: Duration::from_secs(u64::from(self.auth_code_expiration) * 60),
        };
        Ok(AuthThrottle::new(
            WindowRateLimiter::new(per_ip, per_email),
            self.trust_proxy,
        ))
    }
}

/// Validated login and token lifetimes shared by the use cases.
#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub code_length: u32,
    pub code_ttl: chrono::Duration,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_ttl: chrono::Duration,
}

impl AuthSettings {
    /// Default lifetimes (6 digits, 15 min codes, 15 min access, 7 day refresh).
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            code_length: DEFAULT_CODE_LENGTH,
            code_ttl: chrono::Duration::minutes(i64::from(default_code_expiration())),
            access_token_ttl: chrono::Duration::minutes(15),
            refresh_token_ttl: chrono::Duration::days(7),
        }
    }
}

/// Configuration for the `auth-admin` provisioning CLI.
#[derive(Debug, Deserialize)]
pub struct AdminConfig {
    pub database_url: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Config for AdminConfig {}

//! Request throttling for the public login routes.
//!
//! Two budgets guard the code flow: every public `/auth` call counts against
//! the client address, and every code redemption counts against the email it
//! targets. The second one bounds guessing even when addresses rotate.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::AuthServiceError;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Bucket key for callers whose address is unknown.
const UNKNOWN_CLIENT: &str = "unknown";

/// Windows are swept once the table grows past this many keys.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    /// Any public `/auth` request.
    AuthRequest,
    /// One `/auth/verify-code` attempt.
    VerifyCode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

/// Every check records a hit; `Limited` means the budget was already spent.
pub trait RateLimiter: Send + Sync {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision;
    fn check_email(&self, email: &str, action: RateLimitAction) -> RateLimitDecision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: Option<&str>, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }

    fn check_email(&self, _email: &str, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

/// At most `max` hits per `window` for one key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max: u32,
    pub window: Duration,
}

#[derive(Debug)]
struct Window {
    started: Instant,
    hits: u32,
}

/// Fixed-window counters held in process memory. Counts reset on restart and
/// are not shared between replicas.
#[derive(Debug)]
pub struct WindowRateLimiter {
    per_ip: RateLimitPolicy,
    per_email: RateLimitPolicy,
    windows: Mutex<HashMap<(RateLimitAction, String), Window>>,
}

impl WindowRateLimiter {
    pub fn new(per_ip: RateLimitPolicy, per_email: RateLimitPolicy) -> Self {
        Self {
            per_ip,
            per_email,
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn hit(
        &self,
        action: RateLimitAction,
        key: &str,
        policy: RateLimitPolicy,
        now: Instant,
    ) -> RateLimitDecision {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        if windows.len() >= PRUNE_THRESHOLD {
            let longest = self.per_ip.window.max(self.per_email.window);
            windows.retain(|_, w| now.saturating_duration_since(w.started) < longest);
        }

        let window = windows
            .entry((action, key.to_owned()))
            .or_insert(Window {
                started: now,
                hits: 0,
            });
        if now.saturating_duration_since(window.started) >= policy.window {
            window.started = now;
            window.hits = 0;
        }
        if window.hits >= policy.max {
            return RateLimitDecision::Limited;
        }
        window.hits += 1;
        RateLimitDecision::Allowed
    }
}

impl RateLimiter for WindowRateLimiter {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision {
        let key = ip.unwrap_or(UNKNOWN_CLIENT);
        self.hit(action, key, self.per_ip, Instant::now())
    }

    fn check_email(&self, email: &str, action: RateLimitAction) -> RateLimitDecision {
        let key = email.to_ascii_lowercase();
        self.hit(action, &key, self.per_email, Instant::now())
    }
}

/// Limiter plus the rule for finding the client address.
#[derive(Clone)]
pub struct AuthThrottle {
    pub limiter: Arc<dyn RateLimiter>,
    /// Read the client from the first `X-Forwarded-For` entry. Enable only
    /// behind a reverse proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl AuthThrottle {
    pub fn new(limiter: impl RateLimiter + 'static, trust_forwarded_for: bool) -> Self {
        Self {
            limiter: Arc::new(limiter),
            trust_forwarded_for,
        }
    }

    /// Lets every request through.
    pub fn disabled() -> Self {
        Self::new(NoopRateLimiter, false)
    }

    pub fn client_ip(&self, request: &Request) -> Option<String> {
        if self.trust_forwarded_for
            && let Some(ip) = forwarded_for(request.headers())
        {
            return Some(ip.to_string());
        }
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    }

    pub fn allow_email(&self, email: &str, action: RateLimitAction) -> bool {
        self.limiter.check_email(email, action) == RateLimitDecision::Allowed
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    let value = headers.get(X_FORWARDED_FOR)?.to_str().ok()?;
    value.split(',').next()?.trim().parse().ok()
}

/// Middleware for the public `/auth` routes: one hit per request against the
/// client address.
pub async fn throttle_by_ip(
    State(throttle): State<AuthThrottle>,
    request: Request,
    next: Next,
) -> Result<Response, AuthServiceError> {
    let ip = throttle.client_ip(&request);
    let decision = throttle
        .limiter
        .check_ip(ip.as_deref(), RateLimitAction::AuthRequest);
    if decision == RateLimitDecision::Limited {
        tracing::warn!(
            client_ip = ip.as_deref().unwrap_or(UNKNOWN_CLIENT),
            path = %request.uri().path(),
            "auth request throttled"
        );
        return Err(AuthServiceError::TooManyRequests);
    }
    Ok(next.run(request).await)
}

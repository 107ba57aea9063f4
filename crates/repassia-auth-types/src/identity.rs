//! Authenticated caller identity, attached to requests by the auth gateway.

use axum::Json;
use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use http::request::Parts;
use serde::Serialize;
use uuid::Uuid;

/// Which credential class authenticated the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Short-lived access token from an email-code login.
    Session,
    /// Permanent fixed token held by a machine client.
    Service,
}

/// Caller identity stored in request extensions by the gateway middleware.
///
/// Handlers take it as an extractor; it rejects with [`MissingIdentity`] when
/// the route was not wrapped by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub profile_id: Uuid,
    pub mode: AuthMode,
}

impl Identity {
    pub fn session(profile_id: Uuid) -> Self {
        Self {
            profile_id,
            mode: AuthMode::Session,
        }
    }

    pub fn service(profile_id: Uuid) -> Self {
        Self {
            profile_id,
            mode: AuthMode::Service,
        }
    }
}

/// 401 `INVALID_TOKEN`, in the `{kind, message}` body every auth error uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingIdentity;

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: &'static str,
}

impl IntoResponse for MissingIdentity {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            kind: "INVALID_TOKEN",
            message: "invalid token",
        };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = MissingIdentity;

    // axum-core 0.5 defines this as `fn -> impl Future + Send` (not `async fn`).
    // Read the extension synchronously and return a 'static async move block.
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let identity = parts.extensions.get::<Identity>().copied();
        async move { identity.ok_or(MissingIdentity) }
    }
}

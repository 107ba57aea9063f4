use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Auth service domain error variants.
///
/// Login failures (`NotFoundOrInactive`, `RateLimited`, `InvalidOrExpired`,
/// `ProfileInactive`) share status 400 and one body shape; only the stable
/// code differs.
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("profile not found or inactive")]
    NotFoundOrInactive,
    #[error("too many code requests, try again later")]
    RateLimited,
    #[error("invalid or expired code")]
    InvalidOrExpired,
    #[error("profile is inactive")]
    ProfileInactive,
    #[error("authorization token required")]
    NoToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("too many requests, try again later")]
    TooManyRequests,
    #[error("profile already exists")]
    ProfileAlreadyExists,
    #[error("profile not found")]
    ProfileNotFound,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AuthServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFoundOrInactive => "NOT_FOUND_OR_INACTIVE",
            Self::RateLimited => "RATE_LIMITED",
            Self::InvalidOrExpired => "INVALID_OR_EXPIRED",
            Self::ProfileInactive => "PROFILE_INACTIVE",
            Self::NoToken => "NO_TOKEN",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            Self::TooManyRequests => "TOO_MANY_REQUESTS",
            Self::ProfileAlreadyExists => "PROFILE_ALREADY_EXISTS",
            Self::ProfileNotFound => "PROFILE_NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::NotFoundOrInactive
            | Self::RateLimited
            | Self::InvalidOrExpired
            | Self::ProfileInactive => StatusCode::BAD_REQUEST,
            Self::NoToken | Self::InvalidToken | Self::InvalidRefreshToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::ProfileAlreadyExists => StatusCode::CONFLICT,
            Self::ProfileNotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AuthServiceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for AuthServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        // TraceLayer records every status; only internal errors carry a cause.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = ?e, kind = "INTERNAL_ERROR", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

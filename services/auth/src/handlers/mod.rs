use axum::extract::{FromRequest, Json, Request};
use serde::Serialize;
use serde::de::DeserializeOwned;

use repassia_domain::email::normalize_email;

use crate::error::AuthServiceError;

pub mod auth_code;
pub mod session;
pub mod token;

/// `axum::Json` whose rejections render as `VALIDATION_ERROR`.
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AuthServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = <Json<T> as FromRequest<S>>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub(crate) fn valid_email(raw: &str) -> Result<String, AuthServiceError> {
    normalize_email(raw)
        .ok_or_else(|| AuthServiceError::Validation("email is not a valid address".to_owned()))
}

pub(crate) fn non_empty<'a>(raw: &'a str, field: &str) -> Result<&'a str, AuthServiceError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(AuthServiceError::Validation(format!("{field} is required")));
    }
    Ok(value)
}

//! Request-time bearer authentication.
//!
//! The gateway holds an ordered list of [`CredentialValidator`]s and tries
//! them in turn: signed access tokens first, permanent fixed tokens second.
//! The first validator that recognizes the credential decides the
//! [`Identity`] attached to the request.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use repassia_auth_types::bearer::bearer_token;
use repassia_auth_types::identity::{AuthMode, Identity};

use crate::domain::repository::ProfileRepository;
use crate::error::AuthServiceError;
use crate::usecase::token::verify_access_token;

/// One credential class the gateway can accept.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    /// Mode reported for identities this validator accepts.
    fn mode(&self) -> AuthMode;

    /// `Ok(None)` means "not mine or not valid"; the gateway moves on to the
    /// next validator. `Err` aborts the request.
    async fn validate(&self, token: &str) -> Result<Option<Uuid>, AuthServiceError>;
}

/// Accepts signed access tokens whose profile is still active.
pub struct SessionTokenValidator<P: ProfileRepository> {
    pub profiles: P,
    pub jwt_secret: String,
}

#[async_trait]
impl<P: ProfileRepository + 'static> CredentialValidator for SessionTokenValidator<P> {
    fn mode(&self) -> AuthMode {
        AuthMode::Session
    }

    async fn validate(&self, token: &str) -> Result<Option<Uuid>, AuthServiceError> {
        let Ok(profile_id) = verify_access_token(token, &self.jwt_secret) else {
            return Ok(None);
        };
        // Doubles as the active check: deactivated profiles are not stamped.
        if self.profiles.touch_last_login(profile_id).await? {
            Ok(Some(profile_id))
        } else {
            Ok(None)
        }
    }
}

/// Accepts the permanent fixed token of an active profile.
pub struct FixedTokenValidator<P: ProfileRepository> {
    pub profiles: P,
}

#[async_trait]
impl<P: ProfileRepository + 'static> CredentialValidator for FixedTokenValidator<P> {
    fn mode(&self) -> AuthMode {
        AuthMode::Service
    }

    async fn validate(&self, token: &str) -> Result<Option<Uuid>, AuthServiceError> {
        let Some(profile) = self.profiles.find_active_by_fixed_token(token).await? else {
            return Ok(None);
        };
        self.profiles.touch_last_login(profile.id).await?;
        Ok(Some(profile.id))
    }
}

pub struct AuthGateway {
    validators: Vec<Box<dyn CredentialValidator>>,
}

impl AuthGateway {
    pub fn new(validators: Vec<Box<dyn CredentialValidator>>) -> Self {
        Self { validators }
    }

    /// Session tokens, then fixed tokens.
    pub fn standard<P>(profiles: P, jwt_secret: impl Into<String>) -> Self
    where
        P: ProfileRepository + Clone + 'static,
    {
        Self::new(vec![
            Box::new(SessionTokenValidator {
                profiles: profiles.clone(),
                jwt_secret: jwt_secret.into(),
            }),
            Box::new(FixedTokenValidator { profiles }),
        ])
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthServiceError> {
        let token = bearer_token(headers).ok_or(AuthServiceError::NoToken)?;

        for validator in &self.validators {
            if let Some(profile_id) = validator.validate(token).await? {
                return Ok(Identity {
                    profile_id,
                    mode: validator.mode(),
                });
            }
        }

        tracing::warn!("bearer credential rejected");
        Err(AuthServiceError::InvalidToken)
    }
}

/// Middleware for protected routes: resolves the bearer credential and stores
/// the [`Identity`] in request extensions for handlers to extract.
pub async fn require_identity(
    State(gateway): State<Arc<AuthGateway>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthServiceError> {
    let identity = gateway.authenticate(request.headers()).await?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

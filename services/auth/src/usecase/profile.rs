use chrono::Utc;
use uuid::Uuid;

use repassia_domain::email::normalize_email;

use crate::domain::repository::ProfileRepository;
use crate::domain::types::{FIXED_TOKEN_PREFIX, Profile};
use crate::error::AuthServiceError;
use crate::usecase::token::generate_opaque_token;

/// `svc_` followed by 256 random bits in base64url.
pub fn generate_fixed_token() -> String {
    format!("{FIXED_TOKEN_PREFIX}{}", generate_opaque_token())
}

// ── CreateProfile ────────────────────────────────────────────────────────────

pub struct CreateProfileInput {
    pub email: String,
    pub name: String,
    /// Generated when `None`.
    pub fixed_token: Option<String>,
}

pub struct CreateProfileUseCase<P: ProfileRepository> {
    pub profiles: P,
}

impl<P: ProfileRepository> CreateProfileUseCase<P> {
    pub async fn execute(&self, input: CreateProfileInput) -> Result<Profile, AuthServiceError> {
        let email = normalize_email(&input.email)
            .ok_or_else(|| AuthServiceError::Validation("email is not valid".to_owned()))?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AuthServiceError::Validation("name is required".to_owned()));
        }
        let fixed_token = match input.fixed_token {
            Some(token) if token.trim().is_empty() => {
                return Err(AuthServiceError::Validation(
                    "fixed token must not be empty".to_owned(),
                ));
            }
            Some(token) => token.trim().to_owned(),
            None => generate_fixed_token(),
        };

        if self.profiles.find_by_email(&email).await?.is_some() {
            return Err(AuthServiceError::ProfileAlreadyExists);
        }

        let now = Utc::now();
        let profile = Profile {
            id: Uuid::now_v7(),
            email,
            name: name.to_owned(),
            fixed_token,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        self.profiles.create(&profile).await?;

        tracing::info!(profile_id = %profile.id, "profile created");
        Ok(profile)
    }
}

// ── SetProfileActive ─────────────────────────────────────────────────────────

pub struct SetProfileActiveUseCase<P: ProfileRepository> {
    pub profiles: P,
}

impl<P: ProfileRepository> SetProfileActiveUseCase<P> {
    pub async fn execute(&self, email: &str, active: bool) -> Result<Profile, AuthServiceError> {
        let email = normalize_email(email)
            .ok_or_else(|| AuthServiceError::Validation("email is not valid".to_owned()))?;
        let profile = self
            .profiles
            .find_by_email(&email)
            .await?
            .ok_or(AuthServiceError::ProfileNotFound)?;

        if !self.profiles.set_active(profile.id, active).await? {
            return Err(AuthServiceError::ProfileNotFound);
        }

        tracing::info!(profile_id = %profile.id, active, "profile active flag changed");
        Ok(Profile {
            is_active: active,
            ..profile
        })
    }
}

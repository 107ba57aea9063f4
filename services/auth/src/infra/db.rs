use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection,
    DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr,
    TransactionTrait,
};
use uuid::Uuid;

use repassia_auth_schema::{auth_codes, outbox_events, profiles, refresh_tokens};

use crate::domain::repository::{
    AuthCodeRepository, CredentialStore, ProfileRepository, RefreshTokenRepository,
};
use crate::domain::types::{AuthCode, OutboxEvent, Profile, RefreshToken};
use crate::error::AuthServiceError;

// ── Credential store ──────────────────────────────────────────────────────────

/// Postgres-backed [`CredentialStore`]; every repository shares one pool.
#[derive(Clone)]
pub struct DbCredentialStore {
    pub db: DatabaseConnection,
}

impl DbCredentialStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl CredentialStore for DbCredentialStore {
    type Profiles = DbProfileRepository;
    type AuthCodes = DbAuthCodeRepository;
    type RefreshTokens = DbRefreshTokenRepository;

    fn profiles(&self) -> DbProfileRepository {
        DbProfileRepository {
            db: self.db.clone(),
        }
    }

    fn auth_codes(&self) -> DbAuthCodeRepository {
        DbAuthCodeRepository {
            db: self.db.clone(),
        }
    }

    fn refresh_tokens(&self) -> DbRefreshTokenRepository {
        DbRefreshTokenRepository {
            db: self.db.clone(),
        }
    }

    async fn ping(&self) -> bool {
        match self.db.ping().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "database ping failed");
                false
            }
        }
    }
}

// ── Profile repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbProfileRepository {
    pub db: DatabaseConnection,
}

impl ProfileRepository for DbProfileRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, AuthServiceError> {
        let model = profiles::Entity::find()
            .filter(profiles::Column::Email.eq(email))
            .one(&self.db)
            .await
            .context("find profile by email")?;
        Ok(model.map(profile_from_model))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, AuthServiceError> {
        let model = profiles::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find profile by id")?;
        Ok(model.map(profile_from_model))
    }

    async fn find_active_by_fixed_token(
        &self,
        token: &str,
    ) -> Result<Option<Profile>, AuthServiceError> {
        let model = profiles::Entity::find()
            .filter(profiles::Column::FixedToken.eq(token))
            .filter(profiles::Column::IsActive.eq(true))
            .one(&self.db)
            .await
            .context("find profile by fixed token")?;
        Ok(model.map(profile_from_model))
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<bool, AuthServiceError> {
        let now = Utc::now();
        let result = profiles::Entity::update_many()
            .col_expr(profiles::Column::LastLoginAt, Expr::value(Some(now)))
            .col_expr(profiles::Column::UpdatedAt, Expr::value(now))
            .filter(profiles::Column::Id.eq(id))
            .filter(profiles::Column::IsActive.eq(true))
            .exec(&self.db)
            .await
            .context("touch profile last login")?;
        Ok(result.rows_affected > 0)
    }

    async fn create(&self, profile: &Profile) -> Result<(), AuthServiceError> {
        let inserted = profiles::ActiveModel {
            id: Set(profile.id),
            email: Set(profile.email.clone()),
            name: Set(profile.name.clone()),
            fixed_token: Set(profile.fixed_token.clone()),
            is_active: Set(profile.is_active),
            last_login_at: Set(profile.last_login_at),
            created_at: Set(profile.created_at),
            updated_at: Set(profile.updated_at),
        }
        .insert(&self.db)
        .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(AuthServiceError::ProfileAlreadyExists)
            }
            Err(err) => Err(anyhow::Error::new(err).context("create profile").into()),
        }
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, AuthServiceError> {
        let result = profiles::Entity::update_many()
            .col_expr(profiles::Column::IsActive, Expr::value(active))
            .col_expr(profiles::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(profiles::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("set profile active flag")?;
        Ok(result.rows_affected > 0)
    }
}

fn profile_from_model(model: profiles::Model) -> Profile {
    Profile {
        id: model.id,
        email: model.email,
        name: model.name,
        fixed_token: model.fixed_token,
        is_active: model.is_active,
        last_login_at: model.last_login_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

// ── AuthCode repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAuthCodeRepository {
    pub db: DatabaseConnection,
}

impl AuthCodeRepository for DbAuthCodeRepository {
    async fn create_within_limit(
        &self,
        code: &AuthCode,
        event: &OutboxEvent,
        since: DateTime<Utc>,
        max_recent: u64,
    ) -> Result<bool, AuthServiceError> {
        let created = self
            .db
            .transaction::<_, bool, sea_orm::DbErr>(|txn| {
                let code = code.clone();
                let event = event.clone();
                Box::pin(async move {
                    // Row lock on the owning profile serializes requests for one email.
                    profiles::Entity::find()
                        .filter(profiles::Column::Email.eq(code.email.as_str()))
                        .lock_exclusive()
                        .one(txn)
                        .await?;

                    let recent = auth_codes::Entity::find()
                        .filter(auth_codes::Column::Email.eq(code.email.as_str()))
                        .filter(auth_codes::Column::Used.eq(false))
                        .filter(auth_codes::Column::CreatedAt.gte(since))
                        .count(txn)
                        .await?;
                    if recent >= max_recent {
                        return Ok(false);
                    }

                    insert_auth_code(txn, &code).await?;
                    insert_outbox_event(txn, &event).await?;
                    Ok(true)
                })
            })
            .await
            .context("create authcode with outbox")?;
        Ok(created)
    }

    async fn find_latest_valid(
        &self,
        email: &str,
        code: &str,
    ) -> Result<Option<AuthCode>, AuthServiceError> {
        let model = auth_codes::Entity::find()
            .filter(auth_codes::Column::Email.eq(email))
            .filter(auth_codes::Column::Code.eq(code))
            .filter(auth_codes::Column::Used.eq(false))
            .filter(auth_codes::Column::ExpiresAt.gt(Utc::now()))
            .order_by_desc(auth_codes::Column::CreatedAt)
            .one(&self.db)
            .await
            .context("find latest valid authcode")?;
        Ok(model.map(authcode_from_model))
    }

    async fn mark_used(&self, id: Uuid) -> Result<bool, AuthServiceError> {
        // The `used = false` guard makes this the serialization point for redemption.
        let result = auth_codes::Entity::update_many()
            .col_expr(auth_codes::Column::Used, Expr::value(true))
            .filter(auth_codes::Column::Id.eq(id))
            .filter(auth_codes::Column::Used.eq(false))
            .exec(&self.db)
            .await
            .context("mark authcode used")?;
        Ok(result.rows_affected == 1)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthServiceError> {
        let result = auth_codes::Entity::delete_many()
            .filter(auth_codes::Column::ExpiresAt.lte(now))
            .exec(&self.db)
            .await
            .context("delete expired authcodes")?;
        Ok(result.rows_affected)
    }
}

async fn insert_auth_code(
    txn: &DatabaseTransaction,
    code: &AuthCode,
) -> Result<(), sea_orm::DbErr> {
    auth_codes::ActiveModel {
        id: Set(code.id),
        email: Set(code.email.clone()),
        code: Set(code.code.clone()),
        expires_at: Set(code.expires_at),
        used: Set(code.used),
        created_at: Set(code.created_at),
    }
    .insert(txn)
    .await?;
    Ok(())
}

async fn insert_outbox_event(
    txn: &DatabaseTransaction,
    event: &OutboxEvent,
) -> Result<(), sea_orm::DbErr> {
    let now = Utc::now();
    outbox_events::ActiveModel {
        id: Set(event.id),
        aggregate_id: Set(event.aggregate_id),
        kind: Set(event.kind.clone()),
        payload: Set(event.payload.clone()),
        idempotency_key: Set(event.idempotency_key.clone()),
        attempts: Set(0),
        last_error: Set(None),
        created_at: Set(now),
        next_attempt_at: Set(now),
        processed_at: Set(None),
        failed_at: Set(None),
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn authcode_from_model(model: auth_codes::Model) -> AuthCode {
    AuthCode {
        id: model.id,
        email: model.email,
        code: model.code,
        expires_at: model.expires_at,
        used: model.used,
        created_at: model.created_at,
    }
}

// ── RefreshToken repository ───────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbRefreshTokenRepository {
    pub db: DatabaseConnection,
}

impl RefreshTokenRepository for DbRefreshTokenRepository {
    async fn create(&self, token: &RefreshToken) -> Result<(), AuthServiceError> {
        refresh_tokens::ActiveModel {
            id: Set(token.id),
            profile_id: Set(token.profile_id),
            token: Set(token.token.clone()),
            expires_at: Set(token.expires_at),
            revoked: Set(token.revoked),
            revoked_at: Set(token.revoked_at),
            created_at: Set(token.created_at),
        }
        .insert(&self.db)
        .await
        .context("create refresh token")?;
        Ok(())
    }

    async fn find_valid(&self, token: &str) -> Result<Option<RefreshToken>, AuthServiceError> {
        let model = refresh_tokens::Entity::find()
            .filter(refresh_tokens::Column::Token.eq(token))
            .filter(refresh_tokens::Column::Revoked.eq(false))
            .filter(refresh_tokens::Column::ExpiresAt.gt(Utc::now()))
            .one(&self.db)
            .await
            .context("find valid refresh token")?;
        Ok(model.map(refresh_token_from_model))
    }

    async fn revoke(&self, token: &str) -> Result<bool, AuthServiceError> {
        let result = refresh_tokens::Entity::update_many()
            .col_expr(refresh_tokens::Column::Revoked, Expr::value(true))
            .col_expr(refresh_tokens::Column::RevokedAt, Expr::value(Some(Utc::now())))
            .filter(refresh_tokens::Column::Token.eq(token))
            .filter(refresh_tokens::Column::Revoked.eq(false))
            .exec(&self.db)
            .await
            .context("revoke refresh token")?;
        Ok(result.rows_affected > 0)
    }

    async fn revoke_all_for_profile(&self, profile_id: Uuid) -> Result<u64, AuthServiceError> {
        let result = refresh_tokens::Entity::update_many()
            .col_expr(refresh_tokens::Column::Revoked, Expr::value(true))
            .col_expr(refresh_tokens::Column::RevokedAt, Expr::value(Some(Utc::now())))
            .filter(refresh_tokens::Column::ProfileId.eq(profile_id))
            .filter(refresh_tokens::Column::Revoked.eq(false))
            .exec(&self.db)
            .await
            .context("revoke all refresh tokens for profile")?;
        Ok(result.rows_affected)
    }

    async fn delete_stale(
        &self,
        now: DateTime<Utc>,
        revoked_before: DateTime<Utc>,
    ) -> Result<u64, AuthServiceError> {
        let result = refresh_tokens::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(refresh_tokens::Column::ExpiresAt.lte(now))
                    .add(
                        Condition::all()
                            .add(refresh_tokens::Column::Revoked.eq(true))
                            .add(refresh_tokens::Column::RevokedAt.lt(revoked_before)),
                    ),
            )
            .exec(&self.db)
            .await
            .context("delete stale refresh tokens")?;
        Ok(result.rows_affected)
    }
}

fn refresh_token_from_model(model: refresh_tokens::Model) -> RefreshToken {
    RefreshToken {
        id: model.id,
        profile_id: model.profile_id,
        token: model.token,
        expires_at: model.expires_at,
        revoked: model.revoked,
        revoked_at: model.revoked_at,
        created_at: model.created_at,
    }
}

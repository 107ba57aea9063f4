//! `auth-admin`: provisioning and housekeeping for auth profiles.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sea_orm::Database;

use repassia_auth::config::AdminConfig;
use repassia_auth::domain::repository::ProfileRepository;
use repassia_auth::error::AuthServiceError;
use repassia_auth::infra::db::{
    DbAuthCodeRepository, DbProfileRepository, DbRefreshTokenRepository,
};
use repassia_auth::usecase::maintenance::PurgeExpiredCredentialsUseCase;
use repassia_auth::usecase::profile::{
    CreateProfileInput, CreateProfileUseCase, SetProfileActiveUseCase,
};
use repassia_auth::usecase::token::RevokeAllRefreshTokensUseCase;
use repassia_core::config::{Config as _, load_dotenv};
use repassia_core::tracing::init_tracing;
use repassia_domain::email::normalize_email;

#[derive(Parser)]
#[command(name = "auth-admin", about = "Manage auth profiles and credentials")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an active profile and print its fixed token.
    CreateProfile {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// Use this fixed token instead of generating one.
        #[arg(long)]
        fixed_token: Option<String>,
    },
    /// Enable or disable a profile.
    SetActive {
        #[arg(long)]
        email: String,
        #[arg(long, action = clap::ArgAction::Set)]
        active: bool,
    },
    /// Revoke every refresh token of a profile.
    RevokeSessions {
        #[arg(long)]
        email: String,
    },
    /// Delete expired codes and stale refresh tokens.
    Purge,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    load_dotenv();
    let config = AdminConfig::try_from_env().context("failed to load admin configuration")?;
    init_tracing(config.log_format);

    let db = Database::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    let profiles = DbProfileRepository { db: db.clone() };
    let auth_codes = DbAuthCodeRepository { db: db.clone() };
    let refresh_tokens = DbRefreshTokenRepository { db: db.clone() };

    let result = run(cli.command, profiles, auth_codes, refresh_tokens).await;
    db.close().await.context("failed to close database")?;
    result
}

async fn run(
    command: Command,
    profiles: DbProfileRepository,
    auth_codes: DbAuthCodeRepository,
    refresh_tokens: DbRefreshTokenRepository,
) -> anyhow::Result<()> {
    match command {
        Command::CreateProfile {
            email,
            name,
            fixed_token,
        } => {
            let usecase = CreateProfileUseCase { profiles };
            let profile = usecase
                .execute(CreateProfileInput {
                    email,
                    name,
                    fixed_token,
                })
                .await
                .map_err(describe)?;
            println!("profile {} created for {}", profile.id, profile.email);
            println!("fixed token: {}", profile.fixed_token);
        }
        Command::SetActive { email, active } => {
            let usecase = SetProfileActiveUseCase { profiles };
            let profile = usecase.execute(&email, active).await.map_err(describe)?;
            println!("profile {} active={}", profile.email, profile.is_active);
        }
        Command::RevokeSessions { email } => {
            let email = normalize_email(&email).context("email is not valid")?;
            let profile = profiles
                .find_by_email(&email)
                .await
                .map_err(describe)?
                .ok_or_else(|| describe(AuthServiceError::ProfileNotFound))?;
            let usecase = RevokeAllRefreshTokensUseCase { refresh_tokens };
            let revoked = usecase.execute(profile.id).await.map_err(describe)?;
            println!("revoked {revoked} refresh token(s) for {}", profile.email);
        }
        Command::Purge => {
            let usecase = PurgeExpiredCredentialsUseCase {
                auth_codes,
                refresh_tokens,
            };
            let report = usecase.execute().await.map_err(describe)?;
            println!(
                "deleted {} auth code(s) and {} refresh token(s)",
                report.auth_codes, report.refresh_tokens
            );
        }
    }
    Ok(())
}

/// Keep the stable code in CLI output and the full cause for internal errors.
fn describe(err: AuthServiceError) -> anyhow::Error {
    match err {
        AuthServiceError::Internal(cause) => cause,
        other => anyhow::anyhow!("{}: {other}", other.kind()),
    }
}

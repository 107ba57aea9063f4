use std::net::SocketAddr;

use anyhow::Context as _;
use sea_orm::Database;
use tracing::info;

use repassia_auth::config::AuthConfig;
use repassia_auth::infra::db::DbCredentialStore;
use repassia_auth::router::build_router;
use repassia_auth::state::AppState;
use repassia_core::config::{Config as _, load_dotenv};
use repassia_core::shutdown::shutdown_signal;
use repassia_core::tracing::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    let config = AuthConfig::try_from_env().context("failed to load auth configuration")?;
    init_tracing(config.log_format);

    let settings = config.auth_settings()?;
    let throttle = config.throttle()?;
    info!(config = ?config, "configuration loaded");

    let db = Database::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let state = AppState::new(DbCredentialStore::new(db.clone()), settings, throttle);
    let router = build_router(state, &config.allowed_origins);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("auth service listening on {addr}");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    db.close().await.context("failed to close database")?;
    info!("auth service stopped");
    Ok(())
}

//! Identity Maintenance Daemon
//!
//! Runs the background half of the identity subsystem: applies migrations
//! and then sweeps expired verification tokens, expired refresh tokens and
//! abandoned unverified accounts on a fixed interval. The request-facing
//! services are a library concern; HTTP wiring lives with the API gateway.

use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;

use identity_service::{config::AppConfig, store::PgCredentialStore, CleanupService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    dotenv().ok();
    env_logger::init();

    log::info!("starting identity maintenance daemon v{}", identity_service::VERSION);

    let config = AppConfig::from_env().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let pool = config.database.create_pool().await?;

    log::info!("running database migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Arc::new(PgCredentialStore::new(pool));
    let cleanup = CleanupService::new(store, config.cleanup.unverified_max_age_hours);

    log::info!(
        "cleanup sweep every {}s; unverified accounts reclaimed after {}h",
        config.cleanup.interval_seconds,
        config.cleanup.unverified_max_age_hours
    );

    cleanup
        .run(Duration::from_secs(config.cleanup.interval_seconds))
        .await;

    Ok(())
}

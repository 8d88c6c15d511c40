use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use dotenv::dotenv;
use pelada_api::config::parse_level;
use pelada_db::{PgStore, Store, create_pool, schema::initialize_database};
use pelada_notifier::{
    config::{EngineSettings, GatewayConfig},
    messenger::{GatewayMessenger, Messenger},
    start_scheduler,
};
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    let log_level = parse_level(&std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(log_level).into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let database_url = std::env::var("DATABASE_URL")
        .wrap_err("DATABASE_URL environment variable must be set")?;
    let settings = EngineSettings::from_env()?;
    let gateway = GatewayConfig::from_env()?;

    // Create database connection pool
    let db_pool = create_pool(&database_url).await?;
    initialize_database(&db_pool).await?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(db_pool));
    let messenger: Arc<dyn Messenger> = Arc::new(GatewayMessenger::new(gateway));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => error!(error = %e, "Failed to listen for ctrl-c, shutting down"),
        }
        let _ = shutdown_tx.send(());
    });

    start_scheduler(store, messenger, settings, shutdown_rx).await;
    info!("Notification scheduler stopped");

    Ok(())
}

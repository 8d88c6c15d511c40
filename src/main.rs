use std::sync::Arc;

use color_eyre::eyre::Result;
use dotenv::dotenv;
use pelada_api::{ApiState, config::ApiConfig};
use pelada_db::{PgStore, Store, create_pool, schema::initialize_database};
use pelada_notifier::{
    Engine,
    config::{EngineSettings, GatewayConfig},
    messenger::{GatewayMessenger, Messenger},
};
use tracing::info;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = ApiConfig::from_env()?;
    let settings = EngineSettings::from_env()?;
    let gateway = GatewayConfig::from_env()?;

    // Initialize logging, RUST_LOG wins over LOG_LEVEL
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(config.log_level).into())
                .from_env_lossy(),
        )
        .init();

    // Create database connection pool
    let db_pool = create_pool(&config.database_url).await?;

    // Initialize database schema
    initialize_database(&db_pool).await?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(db_pool));
    let messenger: Arc<dyn Messenger> = Arc::new(GatewayMessenger::new(gateway));
    let state = Arc::new(ApiState {
        store: store.clone(),
        engine: Engine::new(store, messenger, settings.clone()),
        timezone: settings.timezone,
        webhook_token: config.webhook_token.clone(),
    });

    info!(timezone = %settings.timezone, "Starting pelada API");

    // Start API server
    pelada_api::start_server(config, state).await?;

    Ok(())
}

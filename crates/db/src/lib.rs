pub mod models;
pub mod repositories;
pub mod schema;
pub mod store;

pub mod mock;

use std::time::Duration;

use eyre::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

pub use store::{
    ConfirmationStore, GameStore, IntegrationStore, NotificationStore, NotificationTarget,
    PgStore, PlayerSession, PlayerStore, SessionStore, Store,
};

pub type DbPool = Pool<Postgres>;

pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    Ok(pool)
}

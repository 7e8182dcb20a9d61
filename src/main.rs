//! Users API server. Run with `cargo run`; configure through the environment or `.env`.

use action_api::app::{self, config::AppConfig, repository, Services};
use action_api::telemetry;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    telemetry::init(config.server.log);

    let users: Arc<dyn repository::UserRepository> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
            repository::ensure_users_table(&pool).await?;
            Arc::new(repository::PgUserRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; users are kept in memory");
            Arc::new(repository::InMemoryUserRepository::default())
        }
    };

    let services = Services::new(&config, users)?;
    let running = app::server(&config, &services)?.listen().await?;
    tracing::info!("Users API listening on http://{}", running.local_addr());

    tokio::signal::ctrl_c().await?;
    running.stop().await?;
    Ok(())
}

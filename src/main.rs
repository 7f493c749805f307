use std::sync::Arc;

use filmrate_api::{
    config::{Config, StorageKind},
    db::{create_pool, PgStorage},
    routes::{create_router, AppState},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let state = match config.storage {
        StorageKind::Memory => {
            tracing::info!("Using in-memory storage");
            AppState::in_memory()
        }
        StorageKind::Postgres => {
            let pool = create_pool(&config.database_url, config.db_max_connections).await?;
            let storage = PgStorage::new(pool);
            storage.migrate().await?;
            tracing::info!("Using PostgreSQL storage");
            AppState::from_storage(Arc::new(storage))
        }
    };

    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}

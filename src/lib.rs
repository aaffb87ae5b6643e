mod config;
pub mod db;
pub mod error;
mod flash;
pub mod forms;
pub mod models;
pub mod routes;
pub mod services;
mod templates;
mod utils;
pub mod views;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

pub use config::{AppConfig, ConfigError};
pub use db::Store;
pub use error::{StoreError, StoreResult};
pub use routes::{build_router, AppState};

/// Prepares the database and serves the site until ctrl-c.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let timezone = config.tz()?;
    let state = AppState::new(config.database_path.clone(), timezone);

    let seed = config.seed_sample_data;
    let seed_state = state.clone();
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let mut store = Store::open(&seed_state.database_path).with_context(|| {
            format!("failed to open database {:?}", seed_state.database_path)
        })?;
        if seed && store.seed_if_empty(seed_state.now())? {
            info!("seeded sample venues, artists and shows");
        }
        Ok(())
    })
    .await??;

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(
        addr = %config.bind_addr,
        database = ?config.database_path,
        timezone = %timezone,
        "fyyur listening"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

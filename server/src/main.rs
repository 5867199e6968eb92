#![allow(dead_code)]

use cja::{
    server::run_server,
    setup::{setup_sentry, setup_tracing},
};
use color_eyre::eyre::eyre;
use state::AppState;
use tracing::info;

mod cache;
mod commands;
mod engine;
mod errors;
mod game_channels;
mod manager;
mod models;
mod runner;
mod routes;
mod snake_client;
mod state;

fn main() -> color_eyre::Result<()> {
    let _sentry_guard = setup_sentry();

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()?
        .block_on(async { run_application().await })
}

async fn run_application() -> cja::Result<()> {
    let eyes_shutdown_handle = setup_tracing("snake-arena")?;

    let app_state = AppState::from_env().await?;

    info!("Starting server");
    let result = run_server(routes::routes(app_state)).await;

    if let Some(handle) = eyes_shutdown_handle {
        info!("Shutting down tracing...");
        if let Err(e) = handle.shutdown().await {
            tracing::warn!("Error shutting down tracing: {e}");
        }
    }

    result.map_err(|e| {
        tracing::error!(error = ?e, "server task exited");
        eyre!("server exited: {e}")
    })
}

mod models;
mod handlers;
mod services;
mod middleware;
mod fitness;
mod config;
mod errors;
mod state;
mod templates;
mod routes;

use std::sync::Arc;
use anyhow::Context;
use tracing_subscriber::EnvFilter;
use crate::{
    config::{Config, StoreBackend},
    services::{MemoryUserStore, RedisService, UserStore},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env before reading configuration
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize the user store
    let store: Arc<dyn UserStore> = match config.store.backend {
        StoreBackend::Redis => {
            let client = redis::Client::open(config.redis.url.as_str())
                .context("Invalid Redis URL")?;
            let redis_service = RedisService::connect(client, config.redis.namespace.clone())
                .await
                .context("Failed to connect to Redis")?;
            Arc::new(redis_service)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; accounts are lost on restart");
            Arc::new(MemoryUserStore::new())
        }
    };
    tracing::info!("User store backend: {}", store.backend_tag());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(store, config).context("Failed to build application state")?;
    state.spawn_host_sampler();
    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running on {}", addr);

    axum::serve(listener, app.into_make_service())
        .await
        .context("Server error")?;
    Ok(())
}

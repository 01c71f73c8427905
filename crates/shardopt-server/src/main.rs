//! # shardopt-server: HTTP Service for the Sharding Optimize Engines
//!
//! Exposes the sharding and encryption engine factories as a JSON service, so a
//! middleware written in another language can hand over parsed statements and get
//! routing conditions, rewritten insert rows and generated keys back.
//!
//! ## Endpoints
//!
//! - `GET  /health`             - Health check
//! - `GET  /rules`              - List configured sharded and encrypted tables
//! - `POST /optimize/sharding`  - Optimize a statement against the sharding rule
//! - `POST /optimize/encrypt`   - Optimize a statement against the encrypt rule
//!
//! ## Configuration
//!
//! See [`config`]. Logging is controlled by the `RUST_LOG` environment variable
//! (defaults to `shardopt=debug`).

mod config;
mod routes;
mod state;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("shardopt=debug".parse()?))
        .init();

    let server_config = config::ServerConfig::from_env();
    let rules = server_config.load_rules()?;
    let state = Arc::new(state::AppState::from_config(&rules)?);
    tracing::info!(
        "Loaded {} sharded and {} encrypted tables",
        state.sharding_rule.table_names().len(),
        state.encrypt_rule.table_names().len()
    );

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/rules", get(routes::list_rules))
        .route("/optimize/sharding", post(routes::optimize_sharding))
        .route("/optimize/encrypt", post(routes::optimize_encrypt))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&server_config.listen_addr)
        .await
        .context(format!("Failed to bind {}", server_config.listen_addr))?;
    tracing::info!("shardopt-server listening on http://{}", server_config.listen_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

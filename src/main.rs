//! Gateway Planner - capacity planning for video gateways
//!
//! Sizes gateway hardware for a camera list and assigns every video stream
//! to a gateway instance within its stream, throughput and storage limits.

mod config;
mod db;
mod planner;
mod session;
mod web;

use config::ServerConfig;
use db::Store;
use session::SessionRegistry;
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("gateway_planner=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting gateway planner on port {}...", cfg.http_port);
    tracing::info!("Using database at {}", cfg.db_path);

    // Initialize database
    let store = Arc::new(Store::new(&cfg.db_path)?);
    let plans = store.list_plans()?;
    tracing::info!("Database initialized with {} exported plans", plans.len());

    let sessions = Arc::new(SessionRegistry::new(cfg.max_sessions, cfg.session_ttl()));
    sessions.start_sweeper();
    tracing::info!("Idle sessions expire after {}s", cfg.session_ttl_secs);

    // Start web server
    let server = Server::new(cfg, store, sessions);
    server.start().await?;

    Ok(())
}

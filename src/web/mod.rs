//! Web server module.

mod handlers;

use crate::config::ServerConfig;
use crate::db::Store;
use crate::session::SessionRegistry;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<Store>,
    pub sessions: Arc<SessionRegistry>,
}

/// Web server for the gateway planner.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(config: ServerConfig, store: Arc<Store>, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            state: AppState {
                config,
                store,
                sessions,
            },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        // The UI is served elsewhere
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/catalog", get(handlers::handle_get_catalog))
            // Planning sessions
            .route("/api/sessions", post(handlers::handle_create_session))
            .route("/api/sessions/{id}", get(handlers::handle_get_session))
            .route("/api/sessions/{id}", delete(handlers::handle_delete_session))
            .route(
                "/api/sessions/{id}/configuration",
                put(handlers::handle_update_configuration),
            )
            .route("/api/sessions/{id}/auto-assign", post(handlers::handle_auto_assign))
            .route("/api/sessions/{id}/placements", post(handlers::handle_place_stream))
            .route(
                "/api/sessions/{id}/placements/{stream_id}",
                delete(handlers::handle_remove_stream),
            )
            .route("/api/sessions/{id}/clear", post(handlers::handle_clear_assignment))
            .route("/api/sessions/{id}/export", post(handlers::handle_export_plan))
            // Exported plans
            .route("/api/plans", get(handlers::handle_get_plans))
            .route("/api/plans/{id}", get(handlers::handle_get_plan))
            .route("/api/plans/{id}", delete(handlers::handle_delete_plan))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

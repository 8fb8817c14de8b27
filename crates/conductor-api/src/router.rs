//! Router configuration and server setup.

use std::future::Future;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::handlers;
use crate::state::AppState;

/// Creates the API router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Agents
        .route("/api/agents", get(handlers::list_agents))
        .route(
            "/api/agents/:id",
            get(handlers::get_agent).delete(handlers::uninstall_agent),
        )
        .route("/api/agents/:id/install", post(handlers::install_agent))
        .route("/api/agents/:id/start", post(handlers::start_agent))
        .route("/api/agents/:id/stop", post(handlers::stop_agent))
        .route("/api/agents/:id/restart", post(handlers::restart_agent))
        // Messaging
        .route("/api/agents/:id/config", put(handlers::update_config))
        .route("/api/agents/:id/message", post(handlers::send_message))
        .route("/api/agents/:id/execute", post(handlers::execute_action))
        .route("/api/broadcast", post(handlers::broadcast))
        // Workflows
        .route("/api/workflow/execute", post(handlers::execute_workflow))
        // Monitoring
        .route("/api/metrics", get(handlers::metrics))
        .route("/api/health", get(handlers::health))
        .route("/api/catalog", get(handlers::catalog))
        // Streams
        .route("/api/events", get(handlers::observe_events))
        .route("/agents/connect", get(handlers::agent_channel))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

/// Starts the API server.
pub async fn serve(state: AppState) -> Result<(), std::io::Error> {
    serve_with_shutdown(state, std::future::pending()).await
}

/// Starts the API server and stops accepting connections once `shutdown`
/// resolves.
pub async fn serve_with_shutdown<F>(state: AppState, shutdown: F) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = state.config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on {}", addr);
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

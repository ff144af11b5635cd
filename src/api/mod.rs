mod auth;
mod errors;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::engine::RunCoordinator;

pub use auth::API_KEY_HEADER;

/// Shared application state accessible by all handlers.
pub struct AppState {
    pub coordinator: Arc<RunCoordinator>,
    /// When set, every route except `/health` requires this key.
    pub api_key: Option<String>,
}

/// Build the API router. `/health` stays reachable without an API key.
pub fn router(state: Arc<AppState>, max_body: usize) -> Router {
    let protected = Router::new()
        .route("/agents", get(handlers::list_agents))
        .route("/agents/run", post(handlers::run_agent))
        .route("/agents/status/{run_id}", get(handlers::get_status))
        .route("/runs", get(handlers::list_runs))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .merge(protected)
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the REST API server.
pub async fn serve(host: &str, port: u16, max_body: usize, state: AppState) -> Result<()> {
    let app = router(Arc::new(state), max_body);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Agent runner API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

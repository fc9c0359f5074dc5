//! Web server setup and routing

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::api;
use crate::state::AppState;

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/sources", get(api::list_sources))
        .route("/api/airports", get(api::list_airports))
        .route("/api/airports/reload", post(api::reload))
        .route(
            "/api/airports/height-scale",
            get(api::get_height_scale).put(api::set_height_scale),
        )
        .route("/api/airports/{id}", get(api::get_airport))
        // Globe client is served from another origin
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Load the configured dataset in the background and serve the API
pub async fn run(state: Arc<AppState>, bind: &str) -> Result<()> {
    let app = router(state.clone());

    tokio::spawn(async move {
        if let Err(e) = state.reload(None).await {
            error!(error = %e, "Initial dataset load failed");
        }
    });

    run_http(app, bind).await
}

/// Run plain HTTP server
async fn run_http(app: Router, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, protocol = "HTTP", "Starting web server");
    axum::serve(listener, app).await?;
    Ok(())
}

//! HTTP server for inference
//!
//! Serves one-step forecasts over a small REST API.

mod handlers;
mod routes;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::engine::Executor;

pub use handlers::AppState;
pub use routes::api_routes;

/// Start the HTTP inference server
pub async fn start(executor: Executor, config: ServerConfig) -> Result<()> {
    let state = Arc::new(AppState::new(executor));

    let mut app: Router = Router::new().merge(api_routes()).with_state(state);

    if config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }
    if config.request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /health - Health check");
    tracing::info!("  GET  /info - Artifact summary");
    tracing::info!("  POST /predict - One-step forecast");

    axum::serve(listener, app).await?;

    Ok(())
}

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

use crate::api;
use crate::config::ServerConfig;
use crate::conversation::Assistant;

/// Chat events are tiny; anything larger is rejected before parsing
const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn app(assistant: Arc<Assistant>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api::router(assistant))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
}

pub async fn run(config: &ServerConfig, assistant: Arc<Assistant>) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Web server running at http://{}", addr);

    axum::serve(listener, app(assistant))
        .await
        .context("Web server stopped unexpectedly")
}

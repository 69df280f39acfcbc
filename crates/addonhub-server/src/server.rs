//! HTTP server implementation using Axum.

use crate::handler::{
    handle_addons_xml, handle_addons_xml_md5, handle_asset, handle_health, handle_update,
};
use addonhub_core::RepositoryAggregator;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    pub aggregator: Arc<RepositoryAggregator>,
}

/// Build the repository router.
pub fn build_router(aggregator: Arc<RepositoryAggregator>) -> Router {
    let state = Arc::new(AppState { aggregator });

    Router::new()
        .route("/health", get(handle_health))
        .route("/addons.xml", get(handle_addons_xml))
        .route("/addons.xml.md5", get(handle_addons_xml_md5))
        .route("/update", get(handle_update))
        .route("/:addon_id/*asset_name", get(handle_asset))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the repository HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    aggregator: Arc<RepositoryAggregator>,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let app = build_router(aggregator);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

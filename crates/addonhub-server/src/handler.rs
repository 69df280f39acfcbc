//! Repository route handlers.

use crate::server::AppState;
use addonhub_core::AddonHubError;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Error response for a failed aggregator call.
///
/// Unknown addons and missing remote files map to 404, everything else to 500.
pub struct ApiError(AddonHubError);

impl From<AddonHubError> for ApiError {
    fn from(err: AddonHubError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_not_found() {
            debug!("Not found: {}", self.0);
            StatusCode::NOT_FOUND
        } else {
            error!("Request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, self.0.to_string()).into_response()
    }
}

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub async fn handle_addons_xml(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let manifest = state.aggregator.manifest().await?;
    Ok((
        [(header::CONTENT_TYPE, "application/xml")],
        manifest.xml().to_vec(),
    )
        .into_response())
}

pub async fn handle_addons_xml_md5(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let manifest = state.aggregator.manifest().await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain")],
        manifest.md5().to_string(),
    )
        .into_response())
}

/// Reload entries from scratch and drop every cache.
pub async fn handle_update(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    let count = state.aggregator.update(true).await?;
    state.aggregator.clear_cache().await;
    info!("Entries reloaded, {} addons", count);
    Ok(StatusCode::OK)
}

/// Stream an addon asset from wherever it resolves to.
pub async fn handle_asset(
    State(state): State<Arc<AppState>>,
    Path((addon_id, asset_name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let body = state
        .aggregator
        .resolve_asset(&addon_id, &asset_name)
        .await?;
    debug!("Streaming {}/{} from {}", addon_id, asset_name, body.url());

    let content_type = body
        .content_type()
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    let content_length = body.content_length();

    let mut response = Response::new(Body::from_stream(body.into_response().bytes_stream()));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    if let Some(length) = content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    Ok(response)
}

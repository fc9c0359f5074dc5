//! REST API handlers

use airport_globe_core::{DataSource, DataSourceError, DataSourceSummary, EntityId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

fn error_response(err: &DataSourceError) -> axum::response::Response {
    let status = match err {
        DataSourceError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        DataSourceError::Fetch(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(ApiError::new(err.to_string()))).into_response()
}

#[derive(Serialize)]
struct SourcesResponse {
    revision: u64,
    sources: Vec<DataSourceSummary>,
}

/// List registered data sources
pub async fn list_sources(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(SourcesResponse {
        revision: state.viewer.revision(),
        sources: state.viewer.data_sources().summaries(),
    })
}

/// List current airport entities
pub async fn list_airports(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.airports.entities().values())
}

/// Get one airport entity by id
pub async fn get_airport(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.airports.entities().get_by_id(&EntityId::new(id)) {
        Some(entity) => Json(entity).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiError::new("Airport not found")),
        )
            .into_response(),
    }
}

/// Reload request body
#[derive(Deserialize, Default)]
pub struct ReloadRequest {
    /// Dataset URL; the configured one when absent
    #[serde(default)]
    url: Option<String>,
}

/// Reload the dataset
pub async fn reload(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReloadRequest>,
) -> impl IntoResponse {
    info!(url = ?req.url, "Dataset reload requested");

    match state.reload(req.url.as_deref()).await {
        Ok(count) => Json(serde_json::json!({
            "name": state.airports.name(),
            "entities": count,
        }))
        .into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(Serialize, Deserialize)]
pub struct HeightScale {
    value: f64,
}

/// Get the marker height scale
pub async fn get_height_scale(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HeightScale {
        value: state.airports.height_scale(),
    })
}

/// Set the marker height scale for subsequent loads
pub async fn set_height_scale(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HeightScale>,
) -> impl IntoResponse {
    match state.airports.set_height_scale(req.value) {
        Ok(()) => Json(HeightScale { value: req.value }).into_response(),
        Err(e) => error_response(&e),
    }
}

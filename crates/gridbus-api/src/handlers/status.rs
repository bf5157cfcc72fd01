//! /status handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use super::ApiState;

#[derive(Serialize)]
pub struct StatusResponse {
    pub address: String,
    pub backend: String,
    pub default_bucket: String,
    pub chunks: u64,
    pub bytes: u64,
}

pub async fn handle_status(
    State(state): State<ApiState>,
) -> Result<Json<StatusResponse>, (StatusCode, String)> {
    let stats = state.store.stats().await.map_err(|e| {
        tracing::error!(error = %e, "store stats failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(StatusResponse {
        address: state.address.clone(),
        backend: state.backend.clone(),
        default_bucket: state.default_bucket.clone(),
        chunks: stats.chunks,
        bytes: stats.bytes,
    }))
}

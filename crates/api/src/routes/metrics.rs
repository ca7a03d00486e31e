//! Prometheus Exposition Route

use axum::{extract::State, http::header, response::IntoResponse};
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Render collected metrics, or 404 when no recorder is installed
pub async fn render(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| ApiError::not_found("Metrics are disabled"))?;

    Ok(([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], handle.render()))
}

//! Liveness and Health Routes

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;

/// Fixed liveness text served at `/`
pub const LIVENESS_MESSAGE: &str = "Inference gateway is running!";

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub backend: String,
    pub endpoint: String,
}

/// Liveness check. Never touches the backend.
pub async fn home() -> &'static str {
    LIVENESS_MESSAGE
}

/// Process health and the backend it is wired to
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        backend: state.engine.backend_name().to_string(),
        endpoint: state.engine.endpoint().to_string(),
    })
}

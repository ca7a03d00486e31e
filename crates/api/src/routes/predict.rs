//! Prediction Route

use axum::{body::Bytes, extract::rejection::BytesRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use wire_codec::PredictionVector;

use crate::error::ApiError;
use crate::telemetry;
use crate::AppState;

/// Response for predict endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: PredictionVector,
}

/// Score a batch of feature rows.
///
/// The body is read as raw bytes so that malformed JSON gets the same
/// error envelope as every other failure.
#[tracing::instrument(name = "predict", skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let result = score(&state, body).await;
    telemetry::record_outcome(&result);
    result
}

async fn score(
    state: &AppState,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let body = body?;
    let features = state.validator.parse_request(&body)?;
    let rows = features.row_count();

    let result = state.engine.predict(&features).await?;
    telemetry::record_backend_latency(result.backend_latency);
    telemetry::record_rows_scored(rows);

    info!(rows, latency_ms = result.latency_ms, "Scored feature rows");

    Ok(Json(PredictResponse {
        predictions: result.predictions,
    }))
}

//! Inference Engine Implementation

use data_validator::FeatureMatrix;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use wire_codec::PredictionVector;

use crate::backend::InferenceBackend;
use crate::InferenceError;

/// Result of inference operation
#[derive(Debug, Clone)]
pub struct InferenceResult {
    /// One score per input row, in input order
    pub predictions: PredictionVector,
    /// Time spent waiting on the backend
    pub backend_latency: Duration,
    /// End-to-end latency in milliseconds
    pub latency_ms: u64,
}

/// Runs the encode, invoke and decode steps for one feature matrix.
///
/// Holds no per-request state; a single engine serves every request.
#[derive(Clone)]
pub struct InferenceEngine {
    backend: Arc<dyn InferenceBackend>,
}

impl InferenceEngine {
    /// Create a new inference engine
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self { backend }
    }

    /// Backend name, for logs and health output
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Endpoint the backend scores against
    pub fn endpoint(&self) -> &str {
        self.backend.endpoint()
    }

    /// Score every row of `features`.
    ///
    /// Fails with [`InferenceError::PredictionCountMismatch`] when the
    /// backend does not return exactly one score per row.
    pub async fn predict(&self, features: &FeatureMatrix) -> Result<InferenceResult, InferenceError> {
        let start = Instant::now();

        let payload = wire_codec::encode(features).map_err(InferenceError::Encoding)?;
        let rows = payload.rows();

        let call_start = Instant::now();
        let body = self.backend.invoke(payload).await?;
        let backend_latency = call_start.elapsed();

        let predictions = wire_codec::decode(&body).map_err(InferenceError::Decoding)?;
        if predictions.len() != rows {
            return Err(InferenceError::PredictionCountMismatch {
                expected: rows,
                actual: predictions.len(),
            });
        }

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(
            backend = self.backend.name(),
            rows,
            backend_ms = backend_latency.as_millis() as u64,
            "Inference completed in {}ms",
            latency_ms
        );

        Ok(InferenceResult {
            predictions,
            backend_latency,
            latency_ms,
        })
    }
}

//! Prediction Metrics
//!
//! Recorded through the `metrics` facade; calls are no-ops until a
//! recorder is installed with [`install_recorder`].

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

const REQUESTS_TOTAL: &str = "gateway_predict_requests_total";
const ROWS_SCORED_TOTAL: &str = "gateway_rows_scored_total";
const BACKEND_LATENCY: &str = "gateway_backend_latency_seconds";

const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Install the global Prometheus recorder.
///
/// Can only succeed once per process.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(BACKEND_LATENCY.to_string()), LATENCY_BUCKETS)?
        .install_recorder()?;

    describe_counter!(REQUESTS_TOTAL, "Prediction requests by outcome");
    describe_counter!(ROWS_SCORED_TOTAL, "Feature rows scored by the backend");
    describe_histogram!(BACKEND_LATENCY, Unit::Seconds, "Backend invocation latency");

    Ok(handle)
}

/// Count one finished request, labelled `ok` or with the failing stage
pub fn record_outcome<T>(result: &Result<T, crate::error::ApiError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    counter!(REQUESTS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_rows_scored(rows: usize) {
    counter!(ROWS_SCORED_TOTAL).increment(rows as u64);
}

pub fn record_backend_latency(latency: Duration) {
    histogram!(BACKEND_LATENCY).record(latency.as_secs_f64());
}

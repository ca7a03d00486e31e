//! End-to-end tests for the HTTP surface, with stub backends

mod common;

use api::{ErrorEnvelope, GatewayConfig};
use common::{spawn_gateway, PanickingBackend};
use inference_engine::StaticBackend;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;

async fn gateway(backend: StaticBackend) -> String {
    spawn_gateway(Arc::new(backend), GatewayConfig::default()).await
}

async fn post_predict(base: &str, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("{base}/predict"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_root_is_alive_even_when_backend_is_down() {
    let base = gateway(StaticBackend::failing("connection refused")).await;

    let response = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = response.text().await.unwrap();
    assert_eq!(text, api::routes::health::LIVENESS_MESSAGE);
    assert!(!text.is_empty());
}

#[tokio::test]
async fn test_empty_features_returns_400() {
    let base = gateway(StaticBackend::responding("0.5")).await;

    let (status, body) = post_predict(&base, json!({"features": []})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No features provided"}));

    let (status, body) = post_predict(&base, json!({"rows": [[1, 2]]})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No features provided"}));

    let (status, _) = post_predict(&base, json!({"features": null})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_single_row_prediction() {
    let base = gateway(StaticBackend::responding("0.87")).await;

    let (status, body) = post_predict(&base, json!({"features": [[1, 2, 3]]})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"predictions": [0.87]}));
}

#[tokio::test]
async fn test_predictions_keep_row_order() {
    let base = gateway(StaticBackend::responding("0.1,0.9")).await;

    let (status, body) = post_predict(&base, json!({"features": [[1, 2], [3, 4]]})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"predictions": [0.1, 0.9]}));
}

#[tokio::test]
async fn test_backend_fault_returns_500() {
    let base = gateway(StaticBackend::failing("connection refused")).await;

    let (status, body) = post_predict(&base, json!({"features": [[1, 2, 3]]})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let envelope: ErrorEnvelope = serde_json::from_value(body).unwrap();
    assert!(envelope.error.contains("connection refused"));
}

#[tokio::test]
async fn test_non_numeric_backend_response_returns_500() {
    let base = gateway(StaticBackend::responding("abc")).await;

    let (status, body) = post_predict(&base, json!({"features": [[1, 2, 3]]})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("predictions").is_none());
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_prediction_count_mismatch_returns_500() {
    let base = gateway(StaticBackend::responding("0.4")).await;

    let (status, body) = post_predict(&base, json!({"features": [[1], [2], [3]]})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["error"],
        "Backend returned 1 predictions for 3 rows"
    );
}

#[tokio::test]
async fn test_ragged_rows_return_400() {
    let base = gateway(StaticBackend::responding("0.1,0.2")).await;

    let (status, body) = post_predict(&base, json!({"features": [[1, 2, 3], [4, 5]]})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("row 1"));
}

#[tokio::test]
async fn test_non_numeric_feature_returns_400() {
    let base = gateway(StaticBackend::responding("0.1")).await;

    let (status, body) = post_predict(&base, json!({"features": [[1, "two", 3]]})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Feature value at row 0, column 1 is not a number"
    );
}

#[tokio::test]
async fn test_malformed_json_returns_400() {
    let base = gateway(StaticBackend::responding("0.1")).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/predict"))
        .header("content-type", "application/json")
        .body("{\"features\": [[1, 2]")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let envelope: ErrorEnvelope = response.json().await.unwrap();
    assert!(envelope.error.starts_with("Invalid JSON body"));
}

#[tokio::test]
async fn test_oversized_body_returns_413_envelope() {
    let mut config = GatewayConfig::default();
    config.server.max_body_bytes = 64;
    let base = spawn_gateway(Arc::new(StaticBackend::responding("0.1")), config).await;

    let rows: Vec<Vec<u32>> = (0..50).map(|i| vec![i, i + 1, i + 2]).collect();
    let (status, body) = post_predict(&base, json!({ "features": rows })).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_handler_panic_returns_500_envelope() {
    let base = spawn_gateway(Arc::new(PanickingBackend), GatewayConfig::default()).await;

    let (status, body) = post_predict(&base, json!({"features": [[1]]})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": api::error::PANIC_MESSAGE}));
    assert!(!body.to_string().contains("model container exploded"));
}

#[tokio::test]
async fn test_unknown_route_returns_404_envelope() {
    let base = gateway(StaticBackend::responding("0.1")).await;

    let response = reqwest::get(format!("{base}/score")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let envelope: ErrorEnvelope = response.json().await.unwrap();
    assert_eq!(envelope.error, "No route for /score");
}

#[tokio::test]
async fn test_health_reports_backend() {
    let base = gateway(StaticBackend::responding("0.1")).await;

    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"], "static");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_metrics_disabled_without_recorder() {
    let base = gateway(StaticBackend::responding("0.1")).await;

    let response = reqwest::get(format!("{base}/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() {
    let base = gateway(StaticBackend::responding("0.1")).await;

    let response = reqwest::Client::new()
        .get(format!("{base}/"))
        .header("origin", "http://localhost:3000")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}

#[tokio::test]
async fn test_rate_limit_guards_predict_only() {
    let mut config = GatewayConfig::default();
    config.rate_limit.enabled = true;
    config.rate_limit.per_second = 60;
    config.rate_limit.burst_size = 2;
    let base = spawn_gateway(Arc::new(StaticBackend::responding("0.1")), config).await;

    let mut statuses = Vec::new();
    let mut last = Value::Null;
    for _ in 0..3 {
        let (status, body) = post_predict(&base, json!({"features": [[1]]})).await;
        statuses.push(status);
        last = body;
    }
    assert_eq!(
        statuses,
        [StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
    );
    let envelope: ErrorEnvelope = serde_json::from_value(last).unwrap();
    assert!(envelope.error.starts_with("Too many requests"));

    for _ in 0..3 {
        let response = reqwest::get(format!("{base}/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

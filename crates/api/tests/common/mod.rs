//! Shared helpers for gateway integration tests

#![allow(dead_code)]

use api::{create_router, AppState, GatewayConfig};
use async_trait::async_trait;
use data_validator::Validator;
use inference_engine::{InferenceBackend, InferenceEngine, InferenceError};
use std::sync::Arc;
use tokio::net::TcpListener;
use wire_codec::EncodedPayload;

/// Start a gateway on an ephemeral port and return its base URL
pub async fn spawn_gateway(backend: Arc<dyn InferenceBackend>, config: GatewayConfig) -> String {
    let state = AppState::new(
        InferenceEngine::new(backend),
        Validator::new(config.validation.clone()),
    );
    let router = create_router(Arc::new(state), &config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(api::serve(listener, router));

    format!("http://{addr}")
}

/// Backend that panics on every call
pub struct PanickingBackend;

#[async_trait]
impl InferenceBackend for PanickingBackend {
    fn name(&self) -> &str {
        "panicking"
    }

    fn endpoint(&self) -> &str {
        "panicking"
    }

    async fn invoke(&self, _payload: EncodedPayload) -> Result<Vec<u8>, InferenceError> {
        panic!("model container exploded");
    }
}

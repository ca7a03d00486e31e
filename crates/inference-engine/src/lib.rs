//! Remote Inference Engine
//!
//! Sends encoded feature rows to a hosted model endpoint and decodes the
//! scores it returns.

mod backend;
mod config;
mod credentials;
mod engine;
mod sagemaker;
pub mod sigv4;

pub use backend::{InferenceBackend, StaticBackend};
pub use config::{BackendConfig, DEFAULT_ENDPOINT_NAME, DEFAULT_REGION};
pub use credentials::{CredentialSource, CredentialsProvider};
pub use engine::{InferenceEngine, InferenceResult};
pub use sagemaker::SageMakerBackend;
pub use sigv4::Credentials;

use thiserror::Error;
use wire_codec::CodecError;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Failed to encode features: {0}")]
    Encoding(#[source] CodecError),
    #[error("Backend invocation failed: {0}")]
    Backend(String),
    #[error("Failed to decode backend response: {0}")]
    Decoding(#[source] CodecError),
    #[error("Backend returned {actual} predictions for {expected} rows")]
    PredictionCountMismatch { expected: usize, actual: usize },
    #[error("Invalid backend configuration: {0}")]
    Config(String),
    #[error("Failed to resolve AWS credentials: {0}")]
    Credentials(String),
}

impl InferenceError {
    /// Short stage label, used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceError::Encoding(_) => "encoding",
            InferenceError::Backend(_) => "backend",
            InferenceError::Decoding(_) | InferenceError::PredictionCountMismatch { .. } => {
                "decoding"
            }
            InferenceError::Config(_) => "config",
            InferenceError::Credentials(_) => "credentials",
        }
    }
}

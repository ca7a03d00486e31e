//! Backend Abstraction

use async_trait::async_trait;
use wire_codec::EncodedPayload;

use crate::InferenceError;

/// A remote service that scores CSV feature rows.
///
/// Implementations return the raw response body; decoding is left to
/// the [`InferenceEngine`](crate::InferenceEngine).
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Endpoint the backend scores against
    fn endpoint(&self) -> &str;

    /// Send one payload and wait for the response body
    async fn invoke(&self, payload: EncodedPayload) -> Result<Vec<u8>, InferenceError>;
}

/// Backend that answers every call with the same outcome.
///
/// Useful for local development and tests without a hosted endpoint.
#[derive(Debug, Clone)]
pub struct StaticBackend {
    response: Result<String, String>,
}

impl StaticBackend {
    /// Always respond with `body`
    pub fn responding(body: impl Into<String>) -> Self {
        Self {
            response: Ok(body.into()),
        }
    }

    /// Always fail with a backend error carrying `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
        }
    }
}

#[async_trait]
impl InferenceBackend for StaticBackend {
    fn name(&self) -> &str {
        "static"
    }

    fn endpoint(&self) -> &str {
        "static"
    }

    async fn invoke(&self, _payload: EncodedPayload) -> Result<Vec<u8>, InferenceError> {
        match &self.response {
            Ok(body) => Ok(body.clone().into_bytes()),
            Err(message) => Err(InferenceError::Backend(message.clone())),
        }
    }
}

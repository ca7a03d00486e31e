//! SageMaker Runtime Backend

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HOST};
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, info, warn};
use wire_codec::{EncodedPayload, CSV_CONTENT_TYPE};

use crate::backend::InferenceBackend;
use crate::config::BackendConfig;
use crate::credentials::CredentialsProvider;
use crate::sigv4::{self, Credentials, SigningParams};
use crate::InferenceError;

const SERVICE: &str = "sagemaker";

/// Longest backend error body echoed back to clients
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Invokes a SageMaker real-time endpoint over HTTPS.
///
/// One instance is built at startup and shared by all requests; the inner
/// `reqwest::Client` pools connections.
pub struct SageMakerBackend {
    config: BackendConfig,
    http: reqwest::Client,
    credentials: Option<CredentialsProvider>,
    url: Url,
    host: String,
}

impl SageMakerBackend {
    /// Create a backend signing with fixed keys. Without credentials
    /// requests go out unsigned.
    pub fn new(
        config: BackendConfig,
        credentials: Option<Credentials>,
    ) -> Result<Self, InferenceError> {
        let provider = credentials.map(CredentialsProvider::fixed).transpose()?;
        Self::with_provider(config, provider)
    }

    /// Create a backend that asks `credentials` before every call
    pub fn with_provider(
        config: BackendConfig,
        credentials: Option<CredentialsProvider>,
    ) -> Result<Self, InferenceError> {
        config.validate()?;

        let raw_url = format!(
            "{}/endpoints/{}/invocations",
            config.base_url(),
            config.endpoint_name
        );
        let url = Url::parse(&raw_url)
            .map_err(|e| InferenceError::Config(format!("invalid URL {raw_url:?}: {e}")))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(InferenceError::Config(format!("URL {raw_url:?} has no host")));
            }
        };

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| InferenceError::Config(format!("failed to build HTTP client: {e}")))?;

        if credentials.is_none() {
            warn!(endpoint = %config.endpoint_name, "No AWS credentials found, requests will be unsigned");
        }
        info!(
            endpoint = %config.endpoint_name,
            region = %config.region,
            "Created SageMaker backend"
        );

        Ok(Self {
            config,
            http,
            credentials,
            url,
            host,
        })
    }

    /// Create a backend using the standard AWS credential chain.
    ///
    /// The chain is resolved once here; when it finds nothing the backend
    /// runs unsigned.
    pub async fn from_default_chain(config: BackendConfig) -> Result<Self, InferenceError> {
        config.validate()?;

        let provider = CredentialsProvider::default_chain()?;
        let provider = match provider.credentials().await {
            Ok(_) => Some(provider),
            Err(e) => {
                warn!(error = %e, "AWS credential chain found nothing");
                None
            }
        };
        Self::with_provider(config, provider)
    }

    /// Full invocation URL
    pub fn invocation_url(&self) -> &Url {
        &self.url
    }

    /// Whether requests are signed
    pub fn is_signed(&self) -> bool {
        self.credentials.is_some()
    }

    fn transport_error(&self, err: reqwest::Error) -> InferenceError {
        if err.is_timeout() {
            let secs = self.config.timeout_secs.unwrap_or_default();
            InferenceError::Backend(format!(
                "endpoint {} did not respond within {secs}s",
                self.config.endpoint_name
            ))
        } else {
            InferenceError::Backend(format!(
                "request to endpoint {} failed: {err}",
                self.config.endpoint_name
            ))
        }
    }
}

#[async_trait]
impl InferenceBackend for SageMakerBackend {
    fn name(&self) -> &str {
        SERVICE
    }

    fn endpoint(&self) -> &str {
        &self.config.endpoint_name
    }

    async fn invoke(&self, payload: EncodedPayload) -> Result<Vec<u8>, InferenceError> {
        let body = payload.into_bytes();

        let mut request = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, CSV_CONTENT_TYPE)
            .header(ACCEPT, CSV_CONTENT_TYPE);

        if let Some(provider) = &self.credentials {
            let credentials = provider.credentials().await?;
            let params = SigningParams {
                credentials: &credentials,
                region: &self.config.region,
                service: SERVICE,
                time: Utc::now(),
            };
            let signed = sigv4::sign(
                "POST",
                self.url.path(),
                &[
                    (HOST.as_str(), self.host.as_str()),
                    (CONTENT_TYPE.as_str(), CSV_CONTENT_TYPE),
                ],
                &body,
                &params,
            );
            for (name, value) in signed.pairs() {
                request = request.header(name, value);
            }
        }

        debug!(endpoint = %self.config.endpoint_name, bytes = body.len(), "Invoking endpoint");

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = extract_error_message(&bytes);
            warn!(
                endpoint = %self.config.endpoint_name,
                status = status.as_u16(),
                %message,
                "Endpoint returned an error"
            );
            return Err(InferenceError::Backend(format!(
                "endpoint {} returned {status}: {message}",
                self.config.endpoint_name
            )));
        }

        Ok(bytes.to_vec())
    }
}

/// Pull a readable message out of an error body.
///
/// The runtime API answers with JSON carrying `message` or `Message`;
/// model containers may return `OriginalMessage` or plain text.
fn extract_error_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        for key in ["OriginalMessage", "message", "Message"] {
            if let Some(message) = value.get(key).and_then(|m| m.as_str()) {
                return message.to_string();
            }
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        "empty response body".to_string()
    } else {
        text.chars().take(MAX_ERROR_BODY_CHARS).collect()
    }
}

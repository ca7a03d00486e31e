//! Gateway Configuration
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. Built-in defaults. `SAGEMAKER_ENDPOINT_NAME` and
//!    `AWS_REGION` / `AWS_DEFAULT_REGION` seed the backend defaults.
//! 2. An optional file named by `GATEWAY_CONFIG` (TOML, YAML or JSON).
//! 3. `GATEWAY_` environment variables, with `__` between nested keys,
//!    e.g. `GATEWAY_SERVER__PORT=8080` or `GATEWAY_BACKEND__TIMEOUT_SECS=30`.
//!
//! The result is loaded once at startup and never changes afterwards.

use config::{Config, ConfigError, Environment, File, Map};
use data_validator::ValidationConfig;
use inference_engine::{BackendConfig, DEFAULT_ENDPOINT_NAME, DEFAULT_REGION};
use serde::{Deserialize, Serialize};

use crate::rate_limit::RateLimitConfig;

/// Selects the hosted endpoint
pub const ENDPOINT_ENV_VAR: &str = "SAGEMAKER_ENDPOINT_NAME";

/// Names an optional configuration file
pub const CONFIG_FILE_ENV_VAR: &str = "GATEWAY_CONFIG";

const ENV_PREFIX: &str = "GATEWAY";

/// Largest request body accepted by default, matching the SageMaker
/// real-time payload limit
pub const DEFAULT_MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

/// Complete gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub validation: ValidationConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request bodies above this size are rejected with 413
    pub max_body_bytes: usize,
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// `host:port` to bind
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            level: "info".to_string(),
        }
    }
}

/// Metrics settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and serve `/metrics`
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl GatewayConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(std::env::vars().collect())
    }

    /// Load configuration from an explicit set of environment variables
    pub fn load_from(vars: Map<String, String>) -> Result<Self, ConfigError> {
        let lookup = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();

        let endpoint_name =
            lookup(ENDPOINT_ENV_VAR).unwrap_or_else(|| DEFAULT_ENDPOINT_NAME.to_string());
        let region = lookup("AWS_REGION")
            .or_else(|| lookup("AWS_DEFAULT_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let mut builder = Config::builder()
            .set_default("backend.endpoint_name", endpoint_name)?
            .set_default("backend.region", region)?;

        if let Some(path) = lookup(CONFIG_FILE_ENV_VAR) {
            builder = builder.add_source(File::with_name(&path));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .source(Some(vars)),
            )
            .build()?;

        let config: GatewayConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Message(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }

        if self.rate_limit.enabled
            && (self.rate_limit.per_second == 0 || self.rate_limit.burst_size == 0)
        {
            return Err(ConfigError::Message(
                "rate_limit.per_second and rate_limit.burst_size must be greater than zero"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

//! Backend Configuration

use serde::{Deserialize, Serialize};

use crate::InferenceError;

/// Endpoint used when none is configured
pub const DEFAULT_ENDPOINT_NAME: &str = "sagemaker-xgboost-2025-10-21-05-17-31-187";

/// Region used when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

const MAX_ENDPOINT_NAME_LEN: usize = 63;

/// Hosted endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// SageMaker endpoint name
    pub endpoint_name: String,
    /// AWS region hosting the endpoint
    pub region: String,
    /// Override for the runtime base URL (signing proxies, local mocks)
    pub base_url: Option<String>,
    /// Whole-request timeout in seconds. Unset means no timeout.
    pub timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint_name: DEFAULT_ENDPOINT_NAME.to_string(),
            region: DEFAULT_REGION.to_string(),
            base_url: None,
            timeout_secs: None,
        }
    }
}

impl BackendConfig {
    /// Config for a named endpoint with everything else defaulted
    pub fn for_endpoint(endpoint_name: impl Into<String>) -> Self {
        Self {
            endpoint_name: endpoint_name.into(),
            ..Default::default()
        }
    }

    /// Runtime base URL, without trailing slash
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://runtime.sagemaker.{}.amazonaws.com", self.region),
        }
    }

    /// Check names before they are placed in URLs and signatures
    pub fn validate(&self) -> Result<(), InferenceError> {
        validate_endpoint_name(&self.endpoint_name)?;

        let region_ok = !self.region.is_empty()
            && self
                .region
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !region_ok {
            return Err(InferenceError::Config(format!(
                "invalid region {:?}",
                self.region
            )));
        }

        if self.timeout_secs == Some(0) {
            return Err(InferenceError::Config(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Endpoint names are 1-63 ASCII alphanumerics or hyphens, starting and
/// ending with an alphanumeric.
fn validate_endpoint_name(name: &str) -> Result<(), InferenceError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_ENDPOINT_NAME_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-');

    if valid {
        Ok(())
    } else {
        Err(InferenceError::Config(format!(
            "invalid endpoint name {name:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BackendConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.base_url(),
            "https://runtime.sagemaker.us-east-1.amazonaws.com"
        );
    }

    #[test]
    fn test_base_url_override() {
        let config = BackendConfig {
            base_url: Some("http://127.0.0.1:9000/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_invalid_endpoint_names() {
        let too_long = "x".repeat(64);
        for name in ["", "-abc", "abc-", "has space", "a/b", too_long.as_str()] {
            let config = BackendConfig::for_endpoint(name);
            assert!(config.validate().is_err(), "accepted {name:?}");
        }
        assert!(BackendConfig::for_endpoint("a").validate().is_ok());
        assert!(BackendConfig::for_endpoint("xgb--v2").validate().is_ok());
    }

    #[test]
    fn test_invalid_region_and_timeout() {
        let config = BackendConfig {
            region: "US East".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = BackendConfig {
            timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

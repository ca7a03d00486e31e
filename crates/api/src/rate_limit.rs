//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Optional per-client limit on scoring traffic, keyed by peer IP via
//! tower_governor. Every request that reaches `/predict` costs a paid
//! backend call, so bursts from a single client can be capped.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use governor::middleware::StateInformationMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::GovernorError;

use crate::error::ApiError;

/// Type alias for the governor config with default settings
/// StateInformationMiddleware is used when use_headers() is called to add X-RateLimit-* headers
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether the limiter is installed at all
    pub enabled: bool,
    /// Seconds between quota replenishments
    pub per_second: u64,
    /// Burst size (max requests that can be made immediately)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            per_second: 1,  // Replenish 1 per second
            burst_size: 20,
        }
    }
}

/// Create a rate limiting governor config
///
/// Returns `None` when either setting is zero.
/// Uses PeerIpKeyExtractor, so the service must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
///
/// Adds X-RateLimit-* headers to responses for quota visibility.
/// Rejections are rendered as JSON error envelopes.
pub fn create_governor_config(config: &RateLimitConfig) -> Option<Arc<DefaultGovernorConfig>> {
    GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()  // Adds X-RateLimit-After, X-RateLimit-Limit, X-RateLimit-Remaining
        .error_handler(rejection_response)
        .finish()
        .map(Arc::new)
}

/// Map a limiter rejection onto the gateway's error envelope
pub fn rejection_response(error: GovernorError) -> Response {
    let (api_error, headers) = match error {
        GovernorError::TooManyRequests { wait_time, headers } => (
            ApiError::Rejected {
                status: StatusCode::TOO_MANY_REQUESTS,
                message: format!("Too many requests, retry in {wait_time}s"),
            },
            headers,
        ),
        GovernorError::UnableToExtractKey => (
            ApiError::Internal("Unable to identify client for rate limiting".to_string()),
            None,
        ),
        GovernorError::Other { code, msg, headers } => (
            ApiError::Rejected {
                status: code,
                message: msg.unwrap_or_else(|| "Request rejected by rate limiter".to_string()),
            },
            headers,
        ),
    };

    let mut response = api_error.into_response();
    if let Some(headers) = headers {
        response.headers_mut().extend(headers);
    }
    response
}

//! HTTP Routes

pub mod health;
pub mod metrics;
pub mod predict;

use crate::error::ApiError;
use axum::http::Uri;

/// Fallback for unknown paths
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}

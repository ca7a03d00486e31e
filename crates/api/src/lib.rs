//! Inference Gateway API Server
//!
//! Accepts feature rows over HTTP, scores them on a hosted model endpoint
//! and returns the predictions as JSON.

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use data_validator::Validator;
use inference_engine::{InferenceEngine, SageMakerBackend};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_governor::GovernorLayer;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod telemetry;

pub use crate::config::{GatewayConfig, LogFormat, LoggingConfig, ServerConfig};
pub use crate::error::{ApiError, ErrorEnvelope};

/// Application state shared across handlers.
///
/// Built once before the listener starts and never mutated, so handlers
/// share it without locking.
pub struct AppState {
    /// Runs encode, invoke and decode against the backend
    pub engine: InferenceEngine,
    /// Request body validation
    pub validator: Validator,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
    /// Prometheus handle, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(engine: InferenceEngine, validator: Validator) -> Self {
        Self {
            engine,
            validator,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Serve metrics from `handle` at `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Create the application router
///
/// The optional rate limiter only guards `/predict`; liveness, health and
/// metrics stay reachable for orchestrator health checks.
pub fn create_router(state: Arc<AppState>, config: &GatewayConfig) -> Router {
    let mut scoring: Router<Arc<AppState>> =
        Router::new().route("/predict", post(routes::predict::predict));

    if config.rate_limit.enabled {
        match rate_limit::create_governor_config(&config.rate_limit) {
            Some(governor) => {
                info!(
                    per_second = config.rate_limit.per_second,
                    burst_size = config.rate_limit.burst_size,
                    "Rate limiting enabled for /predict"
                );
                scoring = scoring.route_layer(GovernorLayer { config: governor });
            }
            None => warn!("Invalid rate limit settings, rate limiting disabled"),
        }
    }

    Router::new()
        .route("/", get(routes::health::home))
        .route("/health", get(routes::health::health))
        .route("/metrics", get(routes::metrics::render))
        .merge(scoring)
        .fallback(routes::not_found)
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.server.cors_origins))
                .layer(CatchPanicLayer::custom(error::panic_response)),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Initialize logging
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("failed to set tracing subscriber: {e}"))
}

/// Serve `router` on an already bound listener until the future is dropped
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

/// Build all components from `config` and run the server until Ctrl-C
pub async fn run_server(config: GatewayConfig) -> anyhow::Result<()> {
    let backend = SageMakerBackend::from_default_chain(config.backend.clone()).await?;
    info!(
        url = %backend.invocation_url(),
        signed = backend.is_signed(),
        "Backend ready"
    );
    let engine = InferenceEngine::new(Arc::new(backend));

    let mut state = AppState::new(engine, Validator::new(config.validation.clone()));
    if config.metrics.enabled {
        state = state.with_metrics(telemetry::install_recorder()?);
    }

    let app = create_router(Arc::new(state), &config);

    let listener = TcpListener::bind(config.server.addr()).await?;
    info!("Starting API server on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

//! Inference Gateway - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, GatewayConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::load().context("failed to load configuration")?;
    init_logging(&config.logging)?;

    info!("=== Inference Gateway v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        endpoint = %config.backend.endpoint_name,
        region = %config.backend.region,
        "Forwarding predictions to hosted endpoint"
    );

    run_server(config).await
}

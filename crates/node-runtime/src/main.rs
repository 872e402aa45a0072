//! # Dispatch Node
//!
//! Serves `AgentDispatchInternal` for the rooms listed in `RD_ROOMS`.

use anyhow::{Context, Result};
use dispatch_telemetry::init_telemetry;
use node_runtime::{NodeConfig, NodeRuntime};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = NodeConfig::from_env().context("Invalid configuration")?;

    // Initialize logging
    let _telemetry = init_telemetry(config.telemetry.clone())
        .context("Failed to initialize telemetry")?;

    info!("===========================================");
    info!("  Room Dispatch Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let runtime = NodeRuntime::new(config);
    runtime.start()?;

    // Keep the node running
    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    // Graceful shutdown
    runtime.shutdown().await;

    Ok(())
}

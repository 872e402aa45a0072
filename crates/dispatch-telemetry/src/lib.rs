//! # Dispatch Telemetry
//!
//! Structured logging for room dispatch processes, built on `tracing`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dispatch_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // Application code here
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RD_SERVICE_NAME` | `room-dispatch` | Service name in logs |
//! | `RD_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `RD_JSON_LOGS` | `false` (`true` in containers) | JSON output |
//! | `RD_CONSOLE_OUTPUT` | `true` | Console output |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Install the global tracing subscriber.
///
/// Returns a guard to hold for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    tracing_setup::init_tracing(&config)?;
    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active. Logs on drop.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry...");
    }
}

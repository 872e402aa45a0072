//! Client configuration from environment variables.

use std::env;
use std::time::Duration;

/// Deadline applied to calls that do not override it.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for an [`crate::RpcClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Timeout for calls without a per-call override.
    pub default_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RD_RPC_TIMEOUT_MS`: default request timeout (default: 5000)
    pub fn from_env() -> Self {
        Self {
            default_timeout: env::var("RD_RPC_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_millis),
        }
    }

    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}

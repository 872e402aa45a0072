//! # Node Configuration
//!
//! Everything the node reads from its environment.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RD_BUS_ENDPOINT` | `memory://` | Bus to connect to |
//! | `RD_BUS_CAPACITY` | `1000` | Per-channel buffer of the in-process bus |
//! | `RD_RPC_TIMEOUT_MS` | `5000` | Default client call deadline |
//! | `RD_ROOMS` | empty | Comma-separated rooms this node serves |
//!
//! Logging variables are read by `dispatch-telemetry`.

use agent_dispatch::RoomName;
use dispatch_telemetry::TelemetryConfig;
use rpc_core::{ClientConfig, DEFAULT_REQUEST_TIMEOUT};
use shared_bus::DEFAULT_CHANNEL_CAPACITY;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// The only bus endpoint this build can open.
pub const MEMORY_BUS_ENDPOINT: &str = "memory://";

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The endpoint names a transport this build does not ship.
    #[error("Unsupported bus endpoint {0:?}, only {MEMORY_BUS_ENDPOINT} is available")]
    UnsupportedBus(String),

    /// A variable is set but cannot be parsed.
    #[error("Invalid value {value:?} for {var}")]
    InvalidValue { var: &'static str, value: String },
}

/// Bus configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    pub endpoint: String,
    /// Messages buffered per channel before slow subscribers lag.
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            endpoint: MEMORY_BUS_ENDPOINT.to_string(),
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    pub bus: BusConfig,
    pub client: ClientConfig,
    /// Rooms registered at startup.
    pub rooms: Vec<RoomName>,
    pub telemetry: TelemetryConfig,
}

impl NodeConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|var| env::var(var).ok())?;
        config.telemetry = TelemetryConfig::from_env();
        Ok(config)
    }

    /// Create configuration from any variable source.
    ///
    /// Telemetry settings are left at their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup("RD_BUS_ENDPOINT")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| MEMORY_BUS_ENDPOINT.to_string());
        if endpoint != MEMORY_BUS_ENDPOINT {
            return Err(ConfigError::UnsupportedBus(endpoint));
        }

        let capacity = parse_positive(&lookup, "RD_BUS_CAPACITY")?
            .map_or(DEFAULT_CHANNEL_CAPACITY, |v| v as usize);
        let timeout = parse_positive(&lookup, "RD_RPC_TIMEOUT_MS")?
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_millis);

        let rooms = lookup("RD_ROOMS")
            .map(|v| parse_rooms(&v))
            .unwrap_or_default();

        Ok(Self {
            bus: BusConfig { endpoint, capacity },
            client: ClientConfig::default().with_default_timeout(timeout),
            rooms,
            telemetry: TelemetryConfig::default(),
        })
    }
}

fn parse_positive<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(ConfigError::InvalidValue { var, value }),
    }
}

/// Split a comma-separated room list, dropping blanks and duplicates.
fn parse_rooms(value: &str) -> Vec<RoomName> {
    let mut rooms: Vec<RoomName> = Vec::new();
    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let room = RoomName::from(name);
        if !rooms.contains(&room) {
            rooms.push(room);
        }
    }
    rooms
}

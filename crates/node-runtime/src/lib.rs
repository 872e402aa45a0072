//! # Node Runtime Library
//!
//! Hosts the agent dispatch service in one process. The main entry point is
//! the `main.rs` binary; the library is exposed for testing.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialize telemetry
//! 3. Open the bus and build the dispatch server
//! 4. Register every configured room
//! 5. Run until Ctrl+C, then drain in-flight calls and close the bus

pub mod config;
pub mod runtime;

pub use config::{BusConfig, ConfigError, NodeConfig};
pub use runtime::NodeRuntime;

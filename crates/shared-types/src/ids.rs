//! Identifiers for requests and RPC instances.
//!
//! Random (UUID v4) so that independently running processes never collide.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Globally unique identifier of one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh request id.
    #[must_use]
    pub fn new() -> Self {
        Self(prefixed("REQ_"))
    }

    /// Wrap an id received on the wire.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Instance id for an RPC client. Also its reply address.
#[must_use]
pub fn new_client_id() -> String {
    prefixed("CLI_")
}

/// Instance id for an RPC server.
#[must_use]
pub fn new_server_id() -> String {
    prefixed("SRV_")
}

fn prefixed(prefix: &str) -> String {
    format!("{prefix}{}", Uuid::new_v4().simple())
}

//! # Bus Errors

use thiserror::Error;

/// Transport-level failures of the message bus.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The bus was closed; no further publish or subscribe is possible.
    #[error("Message bus closed")]
    Closed,

    /// The transport rejected a publish.
    #[error("Publish failed on channel {channel}: {reason}")]
    Publish { channel: String, reason: String },
}

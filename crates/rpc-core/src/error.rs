//! # RPC Errors
//!
//! Every failure a caller or handler can observe.
//!
//! - Transport and timeout failures are local to the call that hit them.
//! - Handler errors travel unchanged from the remote handler to the caller.
//! - Nothing here is fatal to the process.

use shared_bus::BusError;
use shared_types::{CodecError, ErrorCode, ErrorPayload, RequestId};
use thiserror::Error;

/// Errors that can occur during RPC operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The bus failed to publish or subscribe. Never retried here.
    #[error("Transport error: {0}")]
    Transport(#[from] BusError),

    /// No matching response arrived before the deadline.
    #[error("Request {request_id} for {method} timed out")]
    Timeout {
        method: String,
        request_id: RequestId,
    },

    /// The remote handler ran and reported a domain failure.
    #[error("Handler error ({code}): {message}")]
    Handler { code: ErrorCode, message: String },

    /// The (topic, method) pair is already registered on this server.
    #[error("{method} already registered for topic {topic}")]
    RegistrationConflict { topic: String, method: String },

    /// Advisory: the (topic, method) pair was not registered.
    #[error("{method} not registered for topic {topic}")]
    NotRegistered { topic: String, method: String },

    /// The call was made after, or was still pending at, client close.
    #[error("Client closing")]
    ClientClosed,

    /// The call was abandoned before a response arrived.
    #[error("Request cancelled")]
    Cancelled,

    /// The server no longer accepts registrations.
    #[error("Server closed")]
    ServerClosed,

    /// The method is not part of the service definition.
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// A payload or envelope could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

impl RpcError {
    /// A domain failure reported by a handler.
    pub fn handler(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Handler {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::handler(ErrorCode::NotFound, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::handler(ErrorCode::InvalidArgument, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::handler(ErrorCode::AlreadyExists, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::handler(ErrorCode::Internal, message)
    }

    /// Error code this failure is reported with on the wire.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            RpcError::Handler { code, .. } => *code,
            RpcError::Timeout { .. } => ErrorCode::DeadlineExceeded,
            RpcError::Transport(_) | RpcError::ClientClosed | RpcError::ServerClosed => {
                ErrorCode::Unavailable
            }
            RpcError::Codec(_) => ErrorCode::Malformed,
            RpcError::Cancelled => ErrorCode::Canceled,
            RpcError::RegistrationConflict { .. } => ErrorCode::AlreadyExists,
            RpcError::NotRegistered { .. } => ErrorCode::NotFound,
            RpcError::UnknownMethod(_) => ErrorCode::InvalidArgument,
        }
    }

    /// Wire form of this error for a response envelope.
    #[must_use]
    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            RpcError::Handler { code, message } => ErrorPayload::new(*code, message.clone()),
            other => ErrorPayload::new(other.code(), other.to_string()),
        }
    }

    /// Rebuild the handler error carried by a response envelope.
    #[must_use]
    pub fn from_payload(payload: &ErrorPayload) -> Self {
        Self::Handler {
            code: payload.error_code(),
            message: payload.message.clone(),
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::Timeout { .. })
    }

    /// Whether this failure was reported by a remote handler.
    #[must_use]
    pub fn is_handler(&self) -> bool {
        matches!(self, RpcError::Handler { .. })
    }
}

//! # Error Codes
//!
//! Structured errors carried inside response envelopes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error codes shared by clients and servers.
///
/// The integer values are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    Unknown,
    Canceled,
    Malformed,
    DeadlineExceeded,
    Unavailable,
    NotFound,
    InvalidArgument,
    AlreadyExists,
    Internal,
    PermissionDenied,
}

impl ErrorCode {
    /// Wire value of this code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            ErrorCode::Unknown => 0,
            ErrorCode::Canceled => 1,
            ErrorCode::Malformed => 2,
            ErrorCode::DeadlineExceeded => 3,
            ErrorCode::Unavailable => 4,
            ErrorCode::NotFound => 5,
            ErrorCode::InvalidArgument => 6,
            ErrorCode::AlreadyExists => 7,
            ErrorCode::Internal => 8,
            ErrorCode::PermissionDenied => 9,
        }
    }

    /// Parse a wire value; unrecognized values map to `Unknown`.
    #[must_use]
    pub fn from_i32(code: i32) -> Self {
        match code {
            1 => ErrorCode::Canceled,
            2 => ErrorCode::Malformed,
            3 => ErrorCode::DeadlineExceeded,
            4 => ErrorCode::Unavailable,
            5 => ErrorCode::NotFound,
            6 => ErrorCode::InvalidArgument,
            7 => ErrorCode::AlreadyExists,
            8 => ErrorCode::Internal,
            9 => ErrorCode::PermissionDenied,
            _ => ErrorCode::Unknown,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::Unknown => "unknown",
            ErrorCode::Canceled => "canceled",
            ErrorCode::Malformed => "malformed",
            ErrorCode::DeadlineExceeded => "deadline_exceeded",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::NotFound => "not_found",
            ErrorCode::InvalidArgument => "invalid_argument",
            ErrorCode::AlreadyExists => "already_exists",
            ErrorCode::Internal => "internal",
            ErrorCode::PermissionDenied => "permission_denied",
        };
        f.write_str(name)
    }
}

/// Error reported by a remote handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Wire value of an [`ErrorCode`].
    pub code: i32,
    /// Human-readable message from the handler.
    pub message: String,
}

impl ErrorPayload {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_i32(),
            message: message.into(),
        }
    }

    /// The decoded error code.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        ErrorCode::from_i32(self.code)
    }
}

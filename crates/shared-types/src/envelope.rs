//! # Request/Response Envelopes
//!
//! The transient wire records exchanged over the bus.
//!
//! - A request is created by the client per call and discarded once the call
//!   completes or times out.
//! - A response echoes the request's `request_id` and carries either the
//!   handler's result payload or a structured [`ErrorPayload`].

use crate::errors::ErrorPayload;
use crate::ids::RequestId;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A call issued by a client against one (topic, method).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Correlates the response with this request.
    pub request_id: RequestId,

    /// Instance id of the calling client; the response goes to its
    /// response channel.
    pub client_id: String,

    /// Method name as declared in the service definition.
    pub method: String,

    /// Rendered topic key (e.g. a room name).
    pub topic: String,

    /// Encoded request message.
    pub payload: Vec<u8>,

    /// Absolute deadline; servers drop requests received after it.
    pub deadline_unix_ms: Option<i64>,

    /// When the client published the request.
    pub sent_at_unix_ms: i64,
}

impl RequestEnvelope {
    /// Whether the deadline has passed at `now_ms`.
    #[must_use]
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.deadline_unix_ms.is_some_and(|deadline| now_ms > deadline)
    }
}

/// A server's answer to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Echo of the request's id.
    pub request_id: RequestId,

    /// Instance id of the answering server.
    pub server_id: String,

    /// Encoded response message; empty on error.
    pub payload: Vec<u8>,

    /// Set when the handler reported a failure.
    pub error: Option<ErrorPayload>,
}

impl ResponseEnvelope {
    #[must_use]
    pub fn success(request_id: RequestId, server_id: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            request_id,
            server_id: server_id.into(),
            payload,
            error: None,
        }
    }

    #[must_use]
    pub fn failure(
        request_id: RequestId,
        server_id: impl Into<String>,
        error: ErrorPayload,
    ) -> Self {
        Self {
            request_id,
            server_id: server_id.into(),
            payload: Vec::new(),
            error: Some(error),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn unix_millis(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

//! # Channel Naming
//!
//! Bus channel names for request and response traffic.
//!
//! - Requests: `"{service}|{method}|{topic}|REQ"`, one channel per
//!   (topic, method) pair, so a server subscribes only to what it registered.
//! - Responses: `"{service}|{client_id}|RES"`, one channel per client
//!   instance, shared by all of that client's in-flight calls.

/// Channel a server subscribes to for one (topic, method) registration.
#[must_use]
pub fn request_channel(service: &str, method: &str, topic: &str) -> String {
    format!("{service}|{method}|{topic}|REQ")
}

/// Channel a client collects every response on.
#[must_use]
pub fn response_channel(service: &str, client_id: &str) -> String {
    format!("{service}|{client_id}|RES")
}

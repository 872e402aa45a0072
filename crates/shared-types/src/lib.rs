//! # Shared Types Crate
//!
//! This crate contains the wire envelopes, identifiers, error codes and
//! service definitions used by every RPC participant on the bus.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the request/response envelopes and their
//!   binary codec are defined once, here.
//! - **Correlation by Identifier**: a response is matched to its request
//!   purely by `request_id`, never by arrival order.
//! - **Reply Addressing**: a request carries the caller's `client_id`; the
//!   response is published on that client's response channel.

pub mod channel;
pub mod codec;
pub mod envelope;
pub mod errors;
pub mod ids;
pub mod service;

pub use channel::{request_channel, response_channel};
pub use codec::{decode, encode, CodecError};
pub use envelope::{unix_millis, RequestEnvelope, ResponseEnvelope};
pub use errors::{ErrorCode, ErrorPayload};
pub use ids::{new_client_id, new_server_id, RequestId};
pub use service::{MethodInfo, ServiceDefinition};

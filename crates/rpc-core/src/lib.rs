//! # RPC Core
//!
//! Topic-scoped request/response dispatch over the shared message bus.
//!
//! ## Components
//!
//! - [`RpcClient`]: issues requests against a topic, correlates responses by
//!   request id, applies timeout/retry and fails everything on close.
//! - [`RpcServer`]: binds handlers per (topic, method), dispatches inbound
//!   requests concurrently, catches handler panics, and manages the
//!   `Created → Active → ShuttingDown|Killed → Closed` lifecycle.
//! - [`RegistererSet`]: registers every method of a service for one topic as
//!   a unit, rolling back on partial failure.
//!
//! ## Flow
//!
//! ```text
//! RpcClient ── RequestEnvelope ──→ "{svc}|{method}|{topic}|REQ" ──→ RpcServer
//!     ↑                                                               │
//!     └──────── ResponseEnvelope ←── "{svc}|{client_id}|RES" ←────────┘
//! ```
//!
//! ## Ownership
//!
//! Nothing here guarantees that only one server instance serves a topic.
//! That is a deployment-level invariant; if two servers answer, the client
//! keeps the first response and discards the rest.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod options;
pub mod pending;
pub mod registerer;
pub mod server;

pub use client::RpcClient;
pub use config::{ClientConfig, DEFAULT_REQUEST_TIMEOUT};
pub use error::RpcError;
pub use options::{RequestOptions, RetryPolicy};
pub use pending::{PendingRequestStore, PendingStats};
pub use registerer::{Registerer, RegistererSet};
pub use server::{RpcServer, ServerState, ServerStats};

pub use shared_types::{ErrorCode, ServiceDefinition};

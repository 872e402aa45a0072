//! # Agent Dispatch
//!
//! The `AgentDispatchInternal` service: asks agents to join rooms, with one
//! server instance owning each room topic.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): dispatch records and [`RoomName`]
//! - **Ports Layer** (`ports/`): [`AgentDispatchInternal`], what a serving
//!   process implements
//! - **Service Layer** (`service/`): [`InMemoryDispatchService`]
//! - [`AgentDispatchInternalClient`] / [`AgentDispatchInternalServer`]: typed
//!   wrappers over `rpc-core` addressed by room
//!
//! ## Methods
//!
//! | Method | Request | Response |
//! |--------|---------|----------|
//! | `CreateDispatch` | `AgentDispatch` | `AgentDispatch` |
//! | `DeleteDispatch` | `DeleteAgentDispatchRequest` | `AgentDispatch` |
//! | `ListDispatch` | `ListAgentDispatchRequest` | `ListAgentDispatchResponse` |

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod client;
pub mod definition;
pub mod domain;
pub mod ports;
pub mod server;
pub mod service;

pub use client::AgentDispatchInternalClient;
pub use definition::{service_definition, SERVICE_NAME};
pub use domain::{
    AgentDispatch, AgentDispatchState, DeleteAgentDispatchRequest, ListAgentDispatchRequest,
    ListAgentDispatchResponse, RoomName,
};
pub use ports::AgentDispatchInternal;
pub use server::AgentDispatchInternalServer;
pub use service::InMemoryDispatchService;

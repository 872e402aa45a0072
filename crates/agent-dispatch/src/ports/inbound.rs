//! Inbound Ports (Driving Ports)
//!
//! What a process must implement to serve `AgentDispatchInternal` calls.
//! The typed server routes each method to one of these.

use async_trait::async_trait;
use rpc_core::RpcError;

use crate::domain::{
    AgentDispatch, DeleteAgentDispatchRequest, ListAgentDispatchRequest,
    ListAgentDispatchResponse,
};

/// Server-side implementation of the agent dispatch service.
///
/// Calls may be delivered more than once, so implementations should be
/// idempotent where the operation allows it. Domain failures are reported
/// as `RpcError::Handler` and reach the caller unchanged.
#[async_trait]
pub trait AgentDispatchInternal: Send + Sync {
    /// Create a dispatch and return the stored record.
    async fn create_dispatch(&self, request: AgentDispatch) -> Result<AgentDispatch, RpcError>;

    /// Delete a dispatch, returning its final state.
    async fn delete_dispatch(
        &self,
        request: DeleteAgentDispatchRequest,
    ) -> Result<AgentDispatch, RpcError>;

    /// List the dispatches of a room.
    async fn list_dispatch(
        &self,
        request: ListAgentDispatchRequest,
    ) -> Result<ListAgentDispatchResponse, RpcError>;
}

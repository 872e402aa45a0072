//! In-memory dispatch store implementing [`AgentDispatchInternal`].

use async_trait::async_trait;
use parking_lot::RwLock;
use rpc_core::RpcError;
use shared_types::unix_millis;
use std::collections::HashMap;
use std::time::SystemTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{
    AgentDispatch, AgentDispatchState, DeleteAgentDispatchRequest, ListAgentDispatchRequest,
    ListAgentDispatchResponse,
};
use crate::ports::AgentDispatchInternal;

/// Prefix of service-assigned dispatch ids.
pub const DISPATCH_ID_PREFIX: &str = "AD_";

/// Dispatches held in process memory, grouped by room.
///
/// Records keep creation order within a room. Deleted records are removed.
#[derive(Default)]
pub struct InMemoryDispatchService {
    rooms: RwLock<HashMap<String, Vec<AgentDispatch>>>,
}

impl InMemoryDispatchService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live dispatches across all rooms.
    pub fn dispatch_count(&self) -> usize {
        self.rooms.read().values().map(Vec::len).sum()
    }

    fn new_dispatch_id() -> String {
        format!("{DISPATCH_ID_PREFIX}{}", Uuid::new_v4().simple())
    }
}

fn now_ms() -> i64 {
    unix_millis(SystemTime::now())
}

fn require(field: &str, value: &str) -> Result<(), RpcError> {
    if value.is_empty() {
        return Err(RpcError::invalid_argument(format!("{field} is required")));
    }
    Ok(())
}

#[async_trait]
impl AgentDispatchInternal for InMemoryDispatchService {
    async fn create_dispatch(&self, request: AgentDispatch) -> Result<AgentDispatch, RpcError> {
        require("agent_name", &request.agent_name)?;
        require("room", &request.room)?;

        let mut dispatch = request;
        if dispatch.id.is_empty() {
            dispatch.id = Self::new_dispatch_id();
        }

        let mut rooms = self.rooms.write();
        let room = rooms.entry(dispatch.room.clone()).or_default();
        if room.iter().any(|d| d.id == dispatch.id) {
            return Err(RpcError::already_exists(format!(
                "dispatch {} already exists in room {}",
                dispatch.id, dispatch.room
            )));
        }

        dispatch.state = Some(AgentDispatchState {
            created_at_ms: now_ms(),
            deleted_at_ms: 0,
        });
        room.push(dispatch.clone());

        info!(
            dispatch_id = %dispatch.id,
            agent_name = %dispatch.agent_name,
            room = %dispatch.room,
            "Dispatch created"
        );
        Ok(dispatch)
    }

    async fn delete_dispatch(
        &self,
        request: DeleteAgentDispatchRequest,
    ) -> Result<AgentDispatch, RpcError> {
        require("dispatch_id", &request.dispatch_id)?;

        let not_found = || {
            RpcError::not_found(format!(
                "dispatch {} not found in room {}",
                request.dispatch_id, request.room
            ))
        };

        let mut rooms = self.rooms.write();
        let room = rooms.get_mut(&request.room).ok_or_else(not_found)?;
        let index = room
            .iter()
            .position(|d| d.id == request.dispatch_id)
            .ok_or_else(not_found)?;

        let mut dispatch = room.remove(index);
        if room.is_empty() {
            rooms.remove(&request.room);
        }

        let state = dispatch.state.get_or_insert_with(AgentDispatchState::default);
        state.deleted_at_ms = now_ms();

        info!(dispatch_id = %dispatch.id, room = %dispatch.room, "Dispatch deleted");
        Ok(dispatch)
    }

    async fn list_dispatch(
        &self,
        request: ListAgentDispatchRequest,
    ) -> Result<ListAgentDispatchResponse, RpcError> {
        let rooms = self.rooms.read();
        let agent_dispatches: Vec<AgentDispatch> = rooms
            .get(&request.room)
            .map(|room| {
                room.iter()
                    .filter(|d| request.dispatch_id.is_empty() || d.id == request.dispatch_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        debug!(room = %request.room, count = agent_dispatches.len(), "Listed dispatches");
        Ok(ListAgentDispatchResponse { agent_dispatches })
    }
}

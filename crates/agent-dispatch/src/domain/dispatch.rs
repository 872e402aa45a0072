//! Dispatch records exchanged by the `AgentDispatchInternal` methods.

use serde::{Deserialize, Serialize};

/// Request that a named agent join a room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDispatch {
    /// Assigned by the service when left empty on create.
    pub id: String,
    pub agent_name: String,
    pub room: String,
    /// Opaque to the service; handed to the agent as-is.
    pub metadata: String,
    /// Set by the service; ignored on create.
    pub state: Option<AgentDispatchState>,
}

impl AgentDispatch {
    #[must_use]
    pub fn new(agent_name: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            room: room.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into();
        self
    }

    /// Whether the dispatch has been deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.deleted_at_ms != 0)
    }
}

/// Service-maintained timestamps, unix milliseconds. Zero means unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDispatchState {
    pub created_at_ms: i64,
    pub deleted_at_ms: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAgentDispatchRequest {
    pub dispatch_id: String,
    pub room: String,
}

/// An empty `dispatch_id` lists every dispatch in the room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAgentDispatchRequest {
    pub dispatch_id: String,
    pub room: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAgentDispatchResponse {
    pub agent_dispatches: Vec<AgentDispatch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let dispatch = AgentDispatch::new("greeter", "room-1")
            .with_id("d-42")
            .with_metadata(r#"{"lang":"en"}"#);

        assert_eq!(dispatch.id, "d-42");
        assert_eq!(dispatch.agent_name, "greeter");
        assert_eq!(dispatch.room, "room-1");
        assert!(dispatch.state.is_none());
        assert!(!dispatch.is_deleted());
    }

    #[test]
    fn test_is_deleted() {
        let mut dispatch = AgentDispatch::new("greeter", "room-1");
        dispatch.state = Some(AgentDispatchState {
            created_at_ms: 1,
            deleted_at_ms: 0,
        });
        assert!(!dispatch.is_deleted());

        dispatch.state = Some(AgentDispatchState {
            created_at_ms: 1,
            deleted_at_ms: 2,
        });
        assert!(dispatch.is_deleted());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(AgentDispatch::new("greeter", "room-1")).unwrap();
        assert_eq!(json["agent_name"], "greeter");
        assert_eq!(json["state"], serde_json::Value::Null);
    }
}

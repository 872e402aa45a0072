//! Domain layer: dispatch records and room topics. No I/O.

pub mod dispatch;
pub mod room;

pub use dispatch::{
    AgentDispatch, AgentDispatchState, DeleteAgentDispatchRequest, ListAgentDispatchRequest,
    ListAgentDispatchResponse,
};
pub use room::RoomName;

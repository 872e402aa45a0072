//! Shared fixtures for the integration scenarios.

use agent_dispatch::{
    AgentDispatch, AgentDispatchInternal, AgentDispatchInternalClient,
    AgentDispatchInternalServer, DeleteAgentDispatchRequest, InMemoryDispatchService,
    ListAgentDispatchRequest, ListAgentDispatchResponse, RoomName,
};
use async_trait::async_trait;
use rpc_core::{ClientConfig, RpcError};
use shared_bus::InMemoryMessageBus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Upper bound for any single await in a scenario.
pub const SCENARIO_TIMEOUT: Duration = Duration::from_secs(10);

/// A bus, a server on it, and a client on it.
pub struct Harness {
    pub bus: Arc<InMemoryMessageBus>,
    pub server: AgentDispatchInternalServer<RoomName>,
    pub client: AgentDispatchInternalClient<RoomName>,
}

impl Harness {
    pub fn new(service: Arc<dyn AgentDispatchInternal>) -> Self {
        Self::with_client_timeout(service, Duration::from_secs(5))
    }

    pub fn with_client_timeout(service: Arc<dyn AgentDispatchInternal>, timeout: Duration) -> Self {
        let bus = Arc::new(InMemoryMessageBus::new());
        let server = AgentDispatchInternalServer::new(service, bus.clone());
        let client = AgentDispatchInternalClient::new(
            bus.clone(),
            ClientConfig::default().with_default_timeout(timeout),
        )
        .unwrap();
        Self {
            bus,
            server,
            client,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryDispatchService::new()))
    }
}

pub fn room(name: &str) -> RoomName {
    RoomName::from(name)
}

/// Service whose create waits `delay`, announcing each call as it starts.
pub struct SlowService {
    pub delay: Duration,
    pub started: Notify,
    pub calls: AtomicUsize,
    pub completed: AtomicUsize,
}

impl SlowService {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            started: Notify::new(),
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AgentDispatchInternal for SlowService {
    async fn create_dispatch(&self, request: AgentDispatch) -> Result<AgentDispatch, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(request)
    }

    async fn delete_dispatch(
        &self,
        request: DeleteAgentDispatchRequest,
    ) -> Result<AgentDispatch, RpcError> {
        Err(RpcError::not_found(format!(
            "dispatch {} not found",
            request.dispatch_id
        )))
    }

    async fn list_dispatch(
        &self,
        _request: ListAgentDispatchRequest,
    ) -> Result<ListAgentDispatchResponse, RpcError> {
        Ok(ListAgentDispatchResponse::default())
    }
}

/// Service that answers every create with a fixed id, counting calls.
pub struct FixedIdService {
    pub id: String,
    pub calls: AtomicUsize,
}

impl FixedIdService {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentDispatchInternal for FixedIdService {
    async fn create_dispatch(&self, request: AgentDispatch) -> Result<AgentDispatch, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(request.with_id(self.id.clone()))
    }

    async fn delete_dispatch(
        &self,
        request: DeleteAgentDispatchRequest,
    ) -> Result<AgentDispatch, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RpcError::not_found(format!(
            "dispatch {} not found",
            request.dispatch_id
        )))
    }

    async fn list_dispatch(
        &self,
        _request: ListAgentDispatchRequest,
    ) -> Result<ListAgentDispatchResponse, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ListAgentDispatchResponse::default())
    }
}

//! The running node: bus, dispatch service, and its server.

use agent_dispatch::{
    AgentDispatchInternalClient, AgentDispatchInternalServer, InMemoryDispatchService, RoomName,
};
use anyhow::{Context, Result};
use rpc_core::ServerState;
use shared_bus::{InMemoryMessageBus, MessageBus};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::NodeConfig;

/// Hosts the agent dispatch service for a set of rooms.
pub struct NodeRuntime {
    config: NodeConfig,
    bus: Arc<InMemoryMessageBus>,
    service: Arc<InMemoryDispatchService>,
    server: AgentDispatchInternalServer<RoomName>,
}

impl NodeRuntime {
    /// Open the bus and build the server. Nothing is registered yet.
    pub fn new(config: NodeConfig) -> Self {
        info!(
            endpoint = %config.bus.endpoint,
            capacity = config.bus.capacity,
            "Creating dispatch node runtime"
        );
        let bus = Arc::new(InMemoryMessageBus::with_capacity(config.bus.capacity));
        let service = Arc::new(InMemoryDispatchService::new());
        let server = AgentDispatchInternalServer::new(service.clone(), bus.clone());

        Self {
            config,
            bus,
            service,
            server,
        }
    }

    /// Register every configured room.
    ///
    /// Stops at the first room that fails; rooms registered before it stay
    /// registered.
    pub fn start(&self) -> Result<()> {
        if self.config.rooms.is_empty() {
            warn!("No rooms configured (RD_ROOMS), node will serve nothing");
        }
        for room in &self.config.rooms {
            self.serve_room(room)?;
        }
        info!(rooms = self.config.rooms.len(), "Dispatch node started");
        Ok(())
    }

    /// Start serving every dispatch method for `room`.
    pub fn serve_room(&self, room: &RoomName) -> Result<()> {
        self.server
            .register_all_room_topics(room)
            .with_context(|| format!("Failed to register room {room}"))?;
        info!(%room, "Serving room");
        Ok(())
    }

    /// Stop serving `room`.
    pub fn release_room(&self, room: &RoomName) {
        self.server.deregister_all_room_topics(room);
        info!(%room, "Released room");
    }

    /// A client on this node's bus using the configured default timeout.
    pub fn client(&self) -> Result<AgentDispatchInternalClient<RoomName>> {
        AgentDispatchInternalClient::new(self.bus.clone(), self.config.client.clone())
            .context("Failed to create dispatch client")
    }

    /// Drain in-flight calls, then close the bus.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        self.server.shutdown().await;
        self.bus.close();
        info!(
            dispatches = self.service.dispatch_count(),
            "Shutdown complete"
        );
    }

    /// Abandon in-flight calls and close the bus.
    pub fn kill(&self) {
        warn!("Killing dispatch node");
        self.server.kill();
        self.bus.close();
    }

    pub fn state(&self) -> ServerState {
        self.server.inner().state()
    }

    pub fn bus(&self) -> Arc<InMemoryMessageBus> {
        Arc::clone(&self.bus)
    }

    pub fn service(&self) -> Arc<InMemoryDispatchService> {
        Arc::clone(&self.service)
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }
}

//! Typed server for `AgentDispatchInternal`.
//!
//! Binds the methods of an [`AgentDispatchInternal`] implementation to room
//! topics, one method at a time or all together.

use rpc_core::{Registerer, RegistererSet, RpcError, RpcServer};
use shared_bus::MessageBus;
use shared_types::new_server_id;
use std::sync::Arc;

use crate::definition::{service_definition, CREATE_DISPATCH, DELETE_DISPATCH, LIST_DISPATCH};
use crate::domain::{AgentDispatch, DeleteAgentDispatchRequest, ListAgentDispatchRequest};
use crate::ports::AgentDispatchInternal;

/// Registration helpers shared by the typed server and its registerers.
#[derive(Clone)]
struct Bindings {
    server: RpcServer,
    service: Arc<dyn AgentDispatchInternal>,
}

impl Bindings {
    fn register_create(&self, topic: &str) -> Result<(), RpcError> {
        let service = Arc::clone(&self.service);
        self.server
            .register_handler(CREATE_DISPATCH, topic, move |req: AgentDispatch| {
                let service = Arc::clone(&service);
                async move { service.create_dispatch(req).await }
            })
    }

    fn register_delete(&self, topic: &str) -> Result<(), RpcError> {
        let service = Arc::clone(&self.service);
        self.server.register_handler(
            DELETE_DISPATCH,
            topic,
            move |req: DeleteAgentDispatchRequest| {
                let service = Arc::clone(&service);
                async move { service.delete_dispatch(req).await }
            },
        )
    }

    fn register_list(&self, topic: &str) -> Result<(), RpcError> {
        let service = Arc::clone(&self.service);
        self.server
            .register_handler(LIST_DISPATCH, topic, move |req: ListAgentDispatchRequest| {
                let service = Arc::clone(&service);
                async move { service.list_dispatch(req).await }
            })
    }
}

/// Serves dispatch calls for the rooms it is registered on.
pub struct AgentDispatchInternalServer<R: AsRef<str> + ?Sized = str> {
    bindings: Bindings,
    room_topics: RegistererSet<R>,
}

impl<R: AsRef<str> + ?Sized> AgentDispatchInternalServer<R> {
    pub fn new(service: Arc<dyn AgentDispatchInternal>, bus: Arc<dyn MessageBus>) -> Self {
        let bindings = Bindings {
            server: RpcServer::new(service_definition(new_server_id()), bus),
            service,
        };
        let room_topics = Self::room_topic_registerers(&bindings);
        Self {
            bindings,
            room_topics,
        }
    }

    fn room_topic_registerers(bindings: &Bindings) -> RegistererSet<R> {
        let entry = |register: fn(&Bindings, &str) -> Result<(), RpcError>, method: &'static str| {
            let on_register = bindings.clone();
            let on_deregister = bindings.clone();
            Registerer::new(
                move |room: &R| register(&on_register, room.as_ref()),
                move |room: &R| on_deregister.server.deregister_handler(method, room.as_ref()),
            )
        };
        RegistererSet::new()
            .with(entry(Bindings::register_create, CREATE_DISPATCH))
            .with(entry(Bindings::register_delete, DELETE_DISPATCH))
            .with(entry(Bindings::register_list, LIST_DISPATCH))
    }

    pub fn register_create_dispatch_topic(&self, room: &R) -> Result<(), RpcError> {
        self.bindings.register_create(room.as_ref())
    }

    pub fn deregister_create_dispatch_topic(&self, room: &R) -> Result<(), RpcError> {
        self.bindings
            .server
            .deregister_handler(CREATE_DISPATCH, room.as_ref())
    }

    pub fn register_delete_dispatch_topic(&self, room: &R) -> Result<(), RpcError> {
        self.bindings.register_delete(room.as_ref())
    }

    pub fn deregister_delete_dispatch_topic(&self, room: &R) -> Result<(), RpcError> {
        self.bindings
            .server
            .deregister_handler(DELETE_DISPATCH, room.as_ref())
    }

    pub fn register_list_dispatch_topic(&self, room: &R) -> Result<(), RpcError> {
        self.bindings.register_list(room.as_ref())
    }

    pub fn deregister_list_dispatch_topic(&self, room: &R) -> Result<(), RpcError> {
        self.bindings
            .server
            .deregister_handler(LIST_DISPATCH, room.as_ref())
    }

    /// Register every method for `room`. On failure none of the methods
    /// registered by this call remain.
    pub fn register_all_room_topics(&self, room: &R) -> Result<(), RpcError> {
        self.room_topics.register(room)
    }

    /// Deregister every method for `room`, skipping ones not registered.
    pub fn deregister_all_room_topics(&self, room: &R) {
        self.room_topics.deregister(room);
    }

    /// Stop taking calls and wait for in-flight ones to be answered.
    pub async fn shutdown(&self) {
        self.bindings.server.shutdown().await;
    }

    /// Stop immediately, abandoning in-flight calls.
    pub fn kill(&self) {
        self.bindings.server.kill();
    }

    /// The underlying untyped server.
    pub fn inner(&self) -> &RpcServer {
        &self.bindings.server
    }
}

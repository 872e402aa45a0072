//! Typed client for `AgentDispatchInternal`, addressed by room.

use rpc_core::{ClientConfig, RequestOptions, RpcClient, RpcError};
use shared_bus::MessageBus;
use shared_types::new_client_id;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::definition::{service_definition, CREATE_DISPATCH, DELETE_DISPATCH, LIST_DISPATCH};
use crate::domain::{
    AgentDispatch, DeleteAgentDispatchRequest, ListAgentDispatchRequest,
    ListAgentDispatchResponse,
};

/// Calls the dispatch service that owns a room.
///
/// `R` is the caller's room type; anything that reads as a string works.
pub struct AgentDispatchInternalClient<R: AsRef<str> + ?Sized = str> {
    client: RpcClient,
    _room: PhantomData<fn(&R)>,
}

impl<R: AsRef<str> + ?Sized> AgentDispatchInternalClient<R> {
    /// Connect a new client instance to `bus`.
    pub fn new(bus: Arc<dyn MessageBus>, config: ClientConfig) -> Result<Self, RpcError> {
        let client = RpcClient::new(service_definition(new_client_id()), bus, config)?;
        Ok(Self {
            client,
            _room: PhantomData,
        })
    }

    pub async fn create_dispatch(
        &self,
        room: &R,
        request: &AgentDispatch,
        options: RequestOptions,
    ) -> Result<AgentDispatch, RpcError> {
        self.client
            .request_single(CREATE_DISPATCH, room.as_ref(), request, options)
            .await
    }

    pub async fn delete_dispatch(
        &self,
        room: &R,
        request: &DeleteAgentDispatchRequest,
        options: RequestOptions,
    ) -> Result<AgentDispatch, RpcError> {
        self.client
            .request_single(DELETE_DISPATCH, room.as_ref(), request, options)
            .await
    }

    pub async fn list_dispatch(
        &self,
        room: &R,
        request: &ListAgentDispatchRequest,
        options: RequestOptions,
    ) -> Result<ListAgentDispatchResponse, RpcError> {
        self.client
            .request_single(LIST_DISPATCH, room.as_ref(), request, options)
            .await
    }

    /// Close the client; pending calls fail with `ClientClosed`.
    pub fn close(&self) {
        self.client.close();
    }

    /// The underlying untyped client.
    pub fn inner(&self) -> &RpcClient {
        &self.client
    }
}

//! RPC Client (Requester) implementation.
//!
//! The `RpcClient` publishes requests to `(topic, method)` channels and
//! waits for the matching response on its own response channel.

use crate::config::ClientConfig;
use crate::error::RpcError;
use crate::options::RequestOptions;
use crate::pending::{PendingGuard, PendingRequestStore};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_bus::{BusError, MessageBus, Subscription};
use shared_types::{
    decode, encode, request_channel, response_channel, unix_millis, RequestEnvelope, RequestId,
    ResponseEnvelope, ServiceDefinition,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// RPC client for one service.
///
/// Many calls may be in flight at once, against the same or different
/// topics; they are not serialized. Must be created inside a Tokio runtime,
/// since it spawns its response listener.
pub struct RpcClient {
    /// Service name, client id and declared methods.
    definition: Arc<ServiceDefinition>,

    /// Transport.
    bus: Arc<dyn MessageBus>,

    /// In-flight calls by request id.
    pending: Arc<PendingRequestStore>,

    config: ClientConfig,

    /// Set once by `close()`.
    closed: AtomicBool,

    /// Stops the response listener.
    shutdown_tx: watch::Sender<bool>,
}

impl RpcClient {
    /// Create a client and start collecting responses.
    ///
    /// # Errors
    ///
    /// `RpcError::Transport` if the response channel cannot be subscribed.
    pub fn new(
        definition: ServiceDefinition,
        bus: Arc<dyn MessageBus>,
        config: ClientConfig,
    ) -> Result<Self, RpcError> {
        let channel = response_channel(definition.name(), definition.id());
        let subscription = bus.subscribe(&channel)?;

        let pending = Arc::new(PendingRequestStore::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(listen_for_responses(
            subscription,
            Arc::clone(&pending),
            shutdown_rx,
        ));

        info!(
            service = definition.name(),
            client_id = definition.id(),
            "RPC client started"
        );

        Ok(Self {
            definition: Arc::new(definition),
            bus,
            pending,
            config,
            closed: AtomicBool::new(false),
            shutdown_tx,
        })
    }

    /// Call `method` on `topic` and wait for its single response.
    ///
    /// # Errors
    ///
    /// - `UnknownMethod` if `method` is not declared (nothing is published)
    /// - `Transport` if publishing fails
    /// - `Timeout` if no response arrives before the deadline
    /// - `Handler` if the remote handler reported a failure
    /// - `ClientClosed` if the client is, or becomes, closed
    pub async fn request_single<Req, Resp>(
        &self,
        method: &str,
        topic: &str,
        request: &Req,
        options: RequestOptions,
    ) -> Result<Resp, RpcError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        if self.definition.method(method).is_none() {
            return Err(RpcError::UnknownMethod(method.to_string()));
        }

        let payload = encode(request)?;
        let timeout = options.timeout.unwrap_or(self.config.default_timeout);
        let attempts = options.retry.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            match self.attempt(method, topic, payload.clone(), timeout).await {
                Ok(response) => return Ok(decode(&response.payload)?),
                Err(err) if err.is_timeout() && attempt < attempts => {
                    warn!(
                        method,
                        topic,
                        attempt,
                        max_attempts = attempts,
                        "Request timed out, retrying"
                    );
                    tokio::time::sleep(options.retry.backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Publish a call to a method declared without a response.
    ///
    /// Returns once the request is on the bus; no pending entry is kept.
    pub async fn publish_only<Req>(
        &self,
        method: &str,
        topic: &str,
        request: &Req,
    ) -> Result<(), RpcError>
    where
        Req: Serialize + ?Sized,
    {
        let Some(info) = self.definition.method(method) else {
            return Err(RpcError::UnknownMethod(method.to_string()));
        };
        if info.requires_response {
            warn!(method, "publish_only used on a method that sends responses");
        }
        if self.is_closed() {
            return Err(RpcError::ClientClosed);
        }

        let envelope = self.envelope(method, topic, encode(request)?, None);
        let channel = request_channel(self.definition.name(), method, topic);
        self.bus
            .publish(&channel, Bytes::from(encode(&envelope)?))
            .await?;
        Ok(())
    }

    /// One request/response exchange with its own request id and deadline.
    async fn attempt(
        &self,
        method: &str,
        topic: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<ResponseEnvelope, RpcError> {
        if self.is_closed() {
            return Err(RpcError::ClientClosed);
        }

        let envelope = self.envelope(method, topic, payload, Some(timeout));
        let request_id = envelope.request_id.clone();
        let bytes = Bytes::from(encode(&envelope)?);

        // Bookkeeping exists before the request can be answered.
        let rx = self.pending.register(request_id.clone(), method);
        let _guard = PendingGuard::new(&self.pending, request_id.clone());

        // A close that raced with registration has already drained the table.
        if self.is_closed() {
            return Err(RpcError::ClientClosed);
        }

        let channel = request_channel(self.definition.name(), method, topic);
        let receivers = self.bus.publish(&channel, bytes).await?;
        debug!(
            request_id = %request_id,
            method,
            topic,
            receivers,
            "Request published"
        );

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(response))) => match &response.error {
                None => Ok(response),
                Some(error) => Err(RpcError::from_payload(error)),
            },
            Ok(Ok(Err(err))) => Err(err),
            Ok(Err(_)) => Err(RpcError::Cancelled),
            Err(_) => {
                self.pending.expire(&request_id);
                Err(RpcError::Timeout {
                    method: method.to_string(),
                    request_id,
                })
            }
        }
    }

    fn envelope(
        &self,
        method: &str,
        topic: &str,
        payload: Vec<u8>,
        timeout: Option<Duration>,
    ) -> RequestEnvelope {
        let now = SystemTime::now();
        RequestEnvelope {
            request_id: RequestId::new(),
            client_id: self.definition.id().to_string(),
            method: method.to_string(),
            topic: topic.to_string(),
            payload,
            deadline_unix_ms: timeout.map(|t| now.checked_add(t).map_or(i64::MAX, unix_millis)),
            sent_at_unix_ms: unix_millis(now),
        }
    }

    /// Close immediately, without waiting for pending calls.
    ///
    /// Every pending call fails with `ClientClosed` and the response
    /// subscription is released. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let failed = self.pending.fail_all(&RpcError::ClientClosed);
        self.shutdown_tx.send_replace(true);
        info!(
            client_id = self.definition.id(),
            failed_pending = failed,
            "RPC client closed"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn definition(&self) -> &ServiceDefinition {
        &self.definition
    }

    /// The pending-request table, for inspection.
    pub fn pending(&self) -> &PendingRequestStore {
        &self.pending
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.close();
    }
}

/// Response listener task: routes every response to its waiting caller.
async fn listen_for_responses(
    mut subscription: Subscription,
    pending: Arc<PendingRequestStore>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.wait_for(|stop| *stop) => break,
            message = subscription.recv() => {
                let Some(message) = message else {
                    // Bus closed under us; nobody will answer the rest.
                    let failed = pending.fail_all(&RpcError::Transport(BusError::Closed));
                    warn!(failed_pending = failed, "Response channel closed");
                    break;
                };
                match decode::<ResponseEnvelope>(&message) {
                    Ok(response) => {
                        pending.complete(response);
                    }
                    Err(e) => warn!(error = %e, "Dropping undecodable response"),
                }
            }
        }
    }
    debug!(channel = subscription.channel(), "Response listener stopped");
}

//! RPC Server (Responder) implementation.
//!
//! Each `(topic, method)` registration owns one bus subscription and one
//! listener task. Accepted requests run concurrently in their own tasks.
//!
//! ## Lifecycle
//!
//! ```text
//! Created ──register──→ Active ──shutdown──→ ShuttingDown ──drained──→ Closed
//!                          │                      │
//!                          └────────kill──────────┴──→ Killed ──→ Closed
//! ```

use crate::error::RpcError;
use crate::handler::{erase, invoke, is_panic, ErasedHandler};
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_bus::{MessageBus, Subscription};
use shared_types::{
    decode, encode, request_channel, response_channel, unix_millis, MethodInfo, RequestEnvelope,
    ResponseEnvelope, ServiceDefinition,
};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::task::Poll;
use std::time::SystemTime;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use futures::Stream;
use tracing::{debug, error, info, warn};

/// Server lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Constructed, nothing registered yet.
    Created,
    /// At least one registration has been made; requests are accepted.
    Active,
    /// Graceful shutdown in progress; no new requests, in-flight finishing.
    ShuttingDown,
    /// Forced stop in progress; in-flight handlers abandoned.
    Killed,
    /// Terminal.
    Closed,
}

impl ServerState {
    /// Whether the server has stopped taking registrations.
    #[must_use]
    pub fn is_stopping(self) -> bool {
        matches!(
            self,
            ServerState::ShuttingDown | ServerState::Killed | ServerState::Closed
        )
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServerState::Created => "created",
            ServerState::Active => "active",
            ServerState::ShuttingDown => "shutting_down",
            ServerState::Killed => "killed",
            ServerState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Server counters.
#[derive(Debug, Default)]
pub struct ServerStats {
    /// Requests accepted for dispatch
    pub requests_received: AtomicU64,
    /// Responses published
    pub responses_sent: AtomicU64,
    /// Handlers that returned an error
    pub handler_errors: AtomicU64,
    /// Handlers that panicked
    pub handler_panics: AtomicU64,
    /// Requests dropped because their deadline had passed
    pub dropped_expired: AtomicU64,
    /// Requests dropped as undecodable, misrouted, or arriving while stopping
    pub dropped_other: AtomicU64,
}

/// Subscription shared between a registration and its listener task.
///
/// Emptied on stop, which releases the bus subscription immediately.
type SubscriptionSlot = Arc<Mutex<Option<Subscription>>>;

/// Next message from the slot, or `None` once the slot is emptied or the
/// bus closes. The lock is never held across an await.
async fn next_message(slot: &SubscriptionSlot) -> Option<Bytes> {
    std::future::poll_fn(|cx| match slot.lock().as_mut() {
        Some(subscription) => Pin::new(subscription).poll_next(cx),
        None => Poll::Ready(None),
    })
    .await
}

/// One `(topic, method)` binding.
struct Registration {
    subscription: SubscriptionSlot,
    task: JoinHandle<()>,
}

impl Registration {
    fn stop(self) {
        drop(self.subscription.lock().take());
        self.task.abort();
    }
}

/// Count of dispatched-but-unfinished requests.
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(Arc::clone(self))
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

type RegistrationKey = (String, String);

struct ServerInner {
    definition: ServiceDefinition,
    bus: Arc<dyn MessageBus>,
    /// Keyed by (topic, method).
    registrations: Mutex<HashMap<RegistrationKey, Registration>>,
    state: RwLock<ServerState>,
    in_flight: Arc<InFlight>,
    /// Flips to true on kill; running handlers race against it.
    kill_tx: watch::Sender<bool>,
    stats: ServerStats,
}

/// RPC server for one service.
///
/// Cheap to clone; clones share registrations and lifecycle. Dropping the
/// last clone stops every listener.
#[derive(Clone)]
pub struct RpcServer {
    inner: Arc<ServerInner>,
}

impl RpcServer {
    #[must_use]
    pub fn new(definition: ServiceDefinition, bus: Arc<dyn MessageBus>) -> Self {
        let (kill_tx, _) = watch::channel(false);
        info!(
            service = definition.name(),
            server_id = definition.id(),
            "RPC server created"
        );
        Self {
            inner: Arc::new(ServerInner {
                definition,
                bus,
                registrations: Mutex::new(HashMap::new()),
                state: RwLock::new(ServerState::Created),
                in_flight: Arc::new(InFlight::default()),
                kill_tx,
                stats: ServerStats::default(),
            }),
        }
    }

    /// Bind a typed handler to `(topic, method)`.
    ///
    /// # Errors
    ///
    /// - `UnknownMethod` if `method` is not declared by the service
    /// - `RegistrationConflict` if the pair is already bound (existing
    ///   binding untouched)
    /// - `ServerClosed` once shutdown or kill has begun
    /// - `Transport` if the bus refuses the subscription
    pub fn register_handler<Req, Resp, F, Fut>(
        &self,
        method: &str,
        topic: &str,
        handler: F,
    ) -> Result<(), RpcError>
    where
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + Send + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp, RpcError>> + Send + 'static,
    {
        self.register_erased(method, topic, erase(handler))
    }

    /// Bind an already type-erased handler to `(topic, method)`.
    pub fn register_erased(
        &self,
        method: &str,
        topic: &str,
        handler: ErasedHandler,
    ) -> Result<(), RpcError> {
        let Some(info) = self.inner.definition.method(method).cloned() else {
            return Err(RpcError::UnknownMethod(method.to_string()));
        };

        let mut registrations = self.inner.registrations.lock();
        if self.inner.state.read().is_stopping() {
            return Err(RpcError::ServerClosed);
        }

        let key = (topic.to_string(), method.to_string());
        if registrations.contains_key(&key) {
            return Err(RpcError::RegistrationConflict {
                topic: topic.to_string(),
                method: method.to_string(),
            });
        }

        let channel = request_channel(self.inner.definition.name(), method, topic);
        let subscription: SubscriptionSlot =
            Arc::new(Mutex::new(Some(self.inner.bus.subscribe(&channel)?)));
        let task = tokio::spawn(serve_registration(
            Arc::downgrade(&self.inner),
            Arc::clone(&subscription),
            channel,
            info,
            handler,
        ));
        registrations.insert(key, Registration { subscription, task });

        {
            let mut state = self.inner.state.write();
            if *state == ServerState::Created {
                *state = ServerState::Active;
            }
        }

        info!(
            service = self.inner.definition.name(),
            method,
            topic,
            "Handler registered"
        );
        Ok(())
    }

    /// Remove the `(topic, method)` binding; later requests for it are not
    /// delivered to this server. Requests already dispatched still finish.
    ///
    /// # Errors
    ///
    /// `NotRegistered` if the pair was not bound. Callers may ignore it.
    pub fn deregister_handler(&self, method: &str, topic: &str) -> Result<(), RpcError> {
        let key = (topic.to_string(), method.to_string());
        let Some(registration) = self.inner.registrations.lock().remove(&key) else {
            return Err(RpcError::NotRegistered {
                topic: topic.to_string(),
                method: method.to_string(),
            });
        };
        registration.stop();
        info!(
            service = self.inner.definition.name(),
            method,
            topic,
            "Handler deregistered"
        );
        Ok(())
    }

    /// Stop accepting requests and wait for every in-flight handler to
    /// finish and respond, then close. Idempotent.
    pub async fn shutdown(&self) {
        {
            let mut state = self.inner.state.write();
            match *state {
                ServerState::Killed | ServerState::Closed => return,
                ServerState::ShuttingDown => {}
                ServerState::Created | ServerState::Active => {
                    *state = ServerState::ShuttingDown;
                    info!(
                        service = self.inner.definition.name(),
                        in_flight = self.in_flight(),
                        "RPC server shutting down"
                    );
                }
            }
        }

        self.inner.stop_all();
        self.inner.in_flight.wait_idle().await;

        let mut state = self.inner.state.write();
        if *state == ServerState::ShuttingDown {
            *state = ServerState::Closed;
            info!(service = self.inner.definition.name(), "RPC server closed");
        }
    }

    /// Stop immediately. In-flight handlers are abandoned and their callers
    /// receive no response. Idempotent.
    pub fn kill(&self) {
        {
            let mut state = self.inner.state.write();
            if matches!(*state, ServerState::Killed | ServerState::Closed) {
                return;
            }
            *state = ServerState::Killed;
        }
        warn!(
            service = self.inner.definition.name(),
            abandoned = self.in_flight(),
            "RPC server killed"
        );

        self.inner.stop_all();
        self.inner.kill_tx.send_replace(true);
        *self.inner.state.write() = ServerState::Closed;
    }

    pub fn state(&self) -> ServerState {
        *self.inner.state.read()
    }

    pub fn is_registered(&self, method: &str, topic: &str) -> bool {
        self.inner
            .registrations
            .lock()
            .contains_key(&(topic.to_string(), method.to_string()))
    }

    pub fn registration_count(&self) -> usize {
        self.inner.registrations.lock().len()
    }

    /// Requests dispatched and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.count.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> &ServerStats {
        &self.inner.stats
    }

    pub fn definition(&self) -> &ServiceDefinition {
        &self.inner.definition
    }
}

impl ServerInner {
    fn stop_all(&self) {
        let drained: Vec<_> = self.registrations.lock().drain().collect();
        for (_, registration) in drained {
            registration.stop();
        }
    }

    /// Validate one inbound message and spawn its dispatch.
    fn accept(self: &Arc<Self>, info: &MethodInfo, handler: &ErasedHandler, message: Bytes) {
        let request: RequestEnvelope = match decode(&message) {
            Ok(request) => request,
            Err(e) => {
                self.stats.dropped_other.fetch_add(1, Ordering::Relaxed);
                warn!(method = %info.name, error = %e, "Dropping undecodable request");
                return;
            }
        };

        if request.method != info.name {
            self.stats.dropped_other.fetch_add(1, Ordering::Relaxed);
            warn!(
                expected = %info.name,
                received = %request.method,
                "Dropping request for another method"
            );
            return;
        }

        if request.is_expired_at(unix_millis(SystemTime::now())) {
            self.stats.dropped_expired.fetch_add(1, Ordering::Relaxed);
            debug!(
                request_id = %request.request_id,
                method = %request.method,
                "Dropping expired request"
            );
            return;
        }

        // Counted before the state check so shutdown cannot miss it.
        let guard = self.in_flight.enter();
        if *self.state.read() != ServerState::Active {
            self.stats.dropped_other.fetch_add(1, Ordering::Relaxed);
            debug!(request_id = %request.request_id, "Server stopping, request dropped");
            return;
        }

        self.stats.requests_received.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(Arc::clone(self).dispatch(
            request,
            info.requires_response,
            Arc::clone(handler),
            guard,
        ));
    }

    async fn dispatch(
        self: Arc<Self>,
        request: RequestEnvelope,
        requires_response: bool,
        handler: ErasedHandler,
        _guard: InFlightGuard,
    ) {
        let RequestEnvelope {
            request_id,
            client_id,
            method,
            topic,
            payload,
            ..
        } = request;
        let mut kill_rx = self.kill_tx.subscribe();

        let result = tokio::select! {
            result = invoke(&handler, payload) => result,
            _ = kill_rx.wait_for(|killed| *killed) => {
                debug!(request_id = %request_id, method = %method, "Handler abandoned by kill");
                return;
            }
        };

        if let Err(err) = &result {
            if is_panic(err) {
                self.stats.handler_panics.fetch_add(1, Ordering::Relaxed);
                error!(
                    request_id = %request_id,
                    method = %method,
                    topic = %topic,
                    error = %err,
                    "Handler panicked"
                );
            } else {
                self.stats.handler_errors.fetch_add(1, Ordering::Relaxed);
                debug!(
                    request_id = %request_id,
                    method = %method,
                    error = %err,
                    "Handler returned error"
                );
            }
        }

        if !requires_response || *self.kill_tx.borrow() {
            return;
        }

        let server_id = self.definition.id();
        let response = match result {
            Ok(payload) => ResponseEnvelope::success(request_id.clone(), server_id, payload),
            Err(err) => ResponseEnvelope::failure(request_id.clone(), server_id, err.to_payload()),
        };
        let bytes = match encode(&response) {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                error!(request_id = %request_id, error = %e, "Failed to encode response");
                return;
            }
        };

        let channel = response_channel(self.definition.name(), &client_id);
        match self.bus.publish(&channel, bytes).await {
            Ok(_) => {
                self.stats.responses_sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => warn!(request_id = %request_id, error = %e, "Failed to publish response"),
        }
    }
}

impl Drop for ServerInner {
    fn drop(&mut self) {
        for (_, registration) in self.registrations.get_mut().drain() {
            registration.stop();
        }
    }
}

/// Listener task for one registration.
async fn serve_registration(
    server: Weak<ServerInner>,
    subscription: SubscriptionSlot,
    channel: String,
    info: MethodInfo,
    handler: ErasedHandler,
) {
    while let Some(message) = next_message(&subscription).await {
        let Some(server) = server.upgrade() else {
            break;
        };
        server.accept(&info, &handler, message);
    }
    debug!(channel = %channel, "Registration listener stopped");
}

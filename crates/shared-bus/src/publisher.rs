//! # Message Bus
//!
//! Defines the bus contract and its in-process implementation.

use crate::error::BusError;
use crate::subscriber::{ChannelMap, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

/// Publish/subscribe transport shared by RPC clients and servers.
///
/// Implementations must be safe for concurrent use: many tasks publish and
/// subscribe through one `Arc<dyn MessageBus>`.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish a message to a channel.
    ///
    /// # Returns
    ///
    /// The number of live subscribers the message reached. Zero is not an
    /// error: delivery is best-effort.
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<usize, BusError>;

    /// Subscribe to every message published to `channel` from now on.
    fn subscribe(&self, channel: &str) -> Result<Subscription, BusError>;

    /// Stop delivering and release transport resources. Idempotent.
    fn close(&self);

    /// Whether [`MessageBus::close`] has been called.
    fn is_closed(&self) -> bool;
}

/// In-memory implementation of the message bus.
///
/// Uses one `tokio::sync::broadcast` channel per channel name, created on
/// first subscribe and pruned when its last subscription drops. Suitable for
/// single-process deployments and tests; distributed deployments would put a
/// network transport behind the same trait.
pub struct InMemoryMessageBus {
    /// Broadcast senders keyed by channel name.
    channels: ChannelMap,

    /// Set once by `close()`.
    closed: AtomicBool,

    /// Total messages published.
    messages_published: AtomicU64,

    /// Per-channel buffer capacity.
    capacity: usize,
}

impl InMemoryMessageBus {
    /// Create a new in-memory bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory bus with the given per-channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            closed: AtomicBool::new(false),
            messages_published: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Number of live subscriptions on a channel.
    #[must_use]
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .get(channel)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Number of channels with at least one subscription.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    /// Total messages published since creation.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    /// Per-channel buffer capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<usize, BusError> {
        if self.is_closed() {
            return Err(BusError::Closed);
        }

        self.messages_published.fetch_add(1, Ordering::Relaxed);

        let sender = self.channels.read().get(channel).cloned();
        let Some(sender) = sender else {
            trace!(channel, "Message dropped (no subscribers)");
            return Ok(0);
        };

        match sender.send(payload) {
            Ok(receivers) => {
                trace!(channel, receivers, "Message published");
                Ok(receivers)
            }
            Err(_) => {
                // Last subscriber dropped between lookup and send.
                trace!(channel, "Message dropped (no receivers)");
                Ok(0)
            }
        }
    }

    fn subscribe(&self, channel: &str) -> Result<Subscription, BusError> {
        let mut channels = self.channels.write();
        if self.is_closed() {
            return Err(BusError::Closed);
        }

        let receiver = channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        debug!(channel, "New subscription created");

        Ok(Subscription::new(
            receiver,
            channel.to_string(),
            Arc::clone(&self.channels),
        ))
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Dropping every sender ends every live subscription.
        let dropped = {
            let mut channels = self.channels.write();
            let count = channels.len();
            channels.clear();
            count
        };
        info!(channels = dropped, "Message bus closed");
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

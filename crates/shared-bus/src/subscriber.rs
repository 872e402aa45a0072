//! # Subscriptions
//!
//! The receiving side of the message bus.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

/// Broadcast senders keyed by channel name.
pub(crate) type ChannelMap = Arc<RwLock<HashMap<String, broadcast::Sender<Bytes>>>>;

/// A live subscription to one bus channel.
///
/// When dropped, the subscription is removed from the bus, and the channel is
/// pruned once nobody listens to it anymore.
pub struct Subscription {
    /// Messages for this channel.
    inner: BroadcastStream<Bytes>,

    /// Channel name.
    channel: String,

    /// Reference to the bus channel table (for cleanup).
    channels: ChannelMap,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<Bytes>,
        channel: String,
        channels: ChannelMap,
    ) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
            channel,
            channels,
        }
    }

    /// Receive the next message on this channel.
    ///
    /// # Returns
    ///
    /// - `Some(bytes)` - The next message
    /// - `None` - The bus was closed
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.next().await
    }

    /// Name of the subscribed channel.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl Stream for Subscription {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(message))) => return Poll::Ready(Some(message)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(count)))) => {
                    debug!(
                        channel = %self.channel,
                        lagged = count,
                        "Subscriber lagged, some messages dropped"
                    );
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut channels = self.channels.write();
        let Some(sender) = channels.get(&self.channel) else {
            return;
        };

        // Our own receiver is still alive at this point.
        if sender.receiver_count() <= 1 {
            channels.remove(&self.channel);
        }
        debug!(channel = %self.channel, "Subscription dropped");
    }
}

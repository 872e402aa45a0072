//! Pending Request Store - the client's table of in-flight calls.
//!
//! Maps request ids to the waiting caller. An entry is created before the
//! request is published and removed exactly once: by the first matching
//! response, by the caller's deadline, by cancellation, or by client close.

use crate::error::RpcError;
use dashmap::DashMap;
use shared_types::{RequestId, ResponseEnvelope};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::debug;

/// What a waiting caller is woken with.
pub type PendingOutcome = Result<ResponseEnvelope, RpcError>;

/// A pending request waiting for its response
struct PendingRequest {
    /// Channel to wake the caller
    sender: oneshot::Sender<PendingOutcome>,
    /// When request was registered
    created_at: Instant,
    /// Method name (for logging)
    method: String,
}

/// Statistics for pending request store
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total requests registered
    pub total_registered: AtomicU64,
    /// Total requests completed by a response
    pub total_completed: AtomicU64,
    /// Total requests that hit their deadline
    pub total_timeouts: AtomicU64,
    /// Total requests cancelled or failed by close
    pub total_cancelled: AtomicU64,
    /// Responses discarded for unknown or finished requests
    pub total_discarded: AtomicU64,
}

/// Pending request store.
///
/// Flow:
/// 1. Client generates a `RequestId`
/// 2. Client calls `register()` to get a oneshot receiver
/// 3. Client publishes the request
/// 4. Response listener calls `complete()` with each response it receives
/// 5. Client awaits the receiver or times out and calls `expire()`
#[derive(Default)]
pub struct PendingRequestStore {
    pending: DashMap<RequestId, PendingRequest>,
    stats: PendingStats,
}

impl PendingRequestStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending request and get a receiver for its outcome.
    pub fn register(
        &self,
        request_id: RequestId,
        method: &str,
    ) -> oneshot::Receiver<PendingOutcome> {
        let (tx, rx) = oneshot::channel();

        let request = PendingRequest {
            sender: tx,
            created_at: Instant::now(),
            method: method.to_string(),
        };

        debug!(request_id = %request_id, method, "Registered pending request");
        self.pending.insert(request_id, request);
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        rx
    }

    /// Complete a pending request with a response.
    ///
    /// First response wins: returns false if the request is unknown, already
    /// completed, expired, or its caller is gone.
    pub fn complete(&self, response: ResponseEnvelope) -> bool {
        let Some((request_id, pending)) = self.pending.remove(&response.request_id) else {
            self.stats.total_discarded.fetch_add(1, Ordering::Relaxed);
            debug!(
                request_id = %response.request_id,
                server_id = %response.server_id,
                "Discarding response for unknown or finished request"
            );
            return false;
        };

        let response_time = pending.created_at.elapsed();
        match pending.sender.send(Ok(response)) {
            Ok(()) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    request_id = %request_id,
                    method = pending.method,
                    response_time_ms = response_time.as_millis(),
                    "Completed pending request"
                );
                true
            }
            Err(_) => {
                // Receiver was dropped (request cancelled)
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(
                    request_id = %request_id,
                    method = pending.method,
                    "Pending request receiver dropped"
                );
                false
            }
        }
    }

    /// Remove a request whose deadline elapsed.
    pub fn expire(&self, request_id: &RequestId) -> bool {
        let Some((_, pending)) = self.pending.remove(request_id) else {
            return false;
        };
        self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
        debug!(
            request_id = %request_id,
            method = pending.method,
            elapsed_ms = pending.created_at.elapsed().as_millis(),
            "Pending request timed out"
        );
        true
    }

    /// Remove a request abandoned by its caller.
    pub fn cancel(&self, request_id: &RequestId) -> bool {
        if self.pending.remove(request_id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Fail every pending request with `error`. Returns how many were failed.
    pub fn fail_all(&self, error: &RpcError) -> usize {
        let ids: Vec<RequestId> = self.pending.iter().map(|e| e.key().clone()).collect();
        let mut failed = 0;
        for id in ids {
            if let Some((_, pending)) = self.pending.remove(&id) {
                drop(pending.sender.send(Err(error.clone())));
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                failed += 1;
            }
        }
        failed
    }

    /// Get number of currently pending requests
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a request id is pending
    pub fn is_pending(&self, request_id: &RequestId) -> bool {
        self.pending.contains_key(request_id)
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }

    /// Age of the oldest pending request.
    pub fn oldest_age(&self) -> Option<Duration> {
        self.pending
            .iter()
            .map(|e| e.value().created_at.elapsed())
            .max()
    }
}

/// Removes its entry from the store when dropped, unless already removed.
///
/// Covers every exit path of a call, including the caller dropping the
/// call future mid-wait.
pub(crate) struct PendingGuard<'a> {
    store: &'a PendingRequestStore,
    request_id: RequestId,
}

impl<'a> PendingGuard<'a> {
    pub(crate) fn new(store: &'a PendingRequestStore, request_id: RequestId) -> Self {
        Self { store, request_id }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.store.cancel(&self.request_id);
    }
}

//! # Shared Bus - Publish/Subscribe Transport
//!
//! The leaf transport every RPC client and server talks through.
//!
//! ## Contract
//!
//! - `publish(channel, bytes)` is best-effort: a message published while no
//!   one is subscribed is dropped, not an error.
//! - `subscribe(channel)` yields every message published to that channel
//!   after the subscription was created, from any number of publishers.
//! - `close()` is idempotent; afterwards publish/subscribe fail with
//!   [`BusError::Closed`] and live subscriptions end.
//!
//! No ordering is promised across channels, and a slow subscriber may lose
//! messages (lagged messages are skipped). Callers must tolerate duplicates.
//!
//! ```text
//! ┌──────────┐  publish("svc|Create|room-1|REQ")   ┌──────────┐
//! │  Client  │ ──────────────┐                     │  Server  │
//! └──────────┘               ▼                     └──────────┘
//!       ↑             ┌──────────────┐                  ↑  │
//!       │             │ MessageBus   │ ── subscribe() ──┘  │
//!       └─ subscribe ─│              │ ←─── publish(RES) ──┘
//!                     └──────────────┘
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod publisher;
pub mod subscriber;

pub use error::BusError;
pub use publisher::{InMemoryMessageBus, MessageBus};
pub use subscriber::Subscription;

/// Maximum messages buffered per channel before slow subscribers lag.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

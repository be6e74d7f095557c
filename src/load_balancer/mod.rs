//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Location matched → rewritten path known
//!     → pool.rs (snapshot length + cursor under one read lock)
//!     → round_robin.rs (cursor % current pool size)
//!     → peer.rs (authority + Host header value)
//!     → Return selected peer or None when the pool is empty
//! ```
//!
//! # Design Decisions
//! - Round-robin only; no health state, no weights
//! - Peers are `Arc`-shared so a selection outlives a concurrent removal
//! - Pool size is re-read at every selection so removals re-clamp the cursor

pub mod peer;
pub mod pool;
pub mod round_robin;

use std::sync::Arc;

use self::peer::Peer;

/// Peer selection strategy.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Pick the next peer from `peers`, or `None` when the slice is empty.
    fn next_peer(&self, peers: &[Arc<Peer>]) -> Option<Arc<Peer>>;
}

//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{peer::Peer, LoadBalancer};

/// Round-robin selector.
/// Stores a monotonically advancing cursor; the index is taken modulo the
/// pool size observed at selection time.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the cursor and clamp it into `0..len`.
    pub fn next_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.cursor.fetch_add(1, Ordering::Relaxed) % len)
    }
}

impl LoadBalancer for RoundRobin {
    fn next_peer(&self, peers: &[Arc<Peer>]) -> Option<Arc<Peer>> {
        self.next_index(peers.len()).map(|index| peers[index].clone())
    }
}

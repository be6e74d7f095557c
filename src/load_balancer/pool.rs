//! Peer pool management.
//!
//! # Responsibilities
//! - Hold the live peer list of one proxy instance in insertion order
//! - Idempotent add, first-match remove
//! - Select a peer round-robin against the current pool size

use std::sync::{Arc, PoisonError, RwLock};

use crate::load_balancer::{peer::Peer, round_robin::RoundRobin, LoadBalancer};
use crate::topology::Backend;

/// Live peer pool of a proxy instance.
#[derive(Debug, Default)]
pub struct PeerPool {
    peers: RwLock<Vec<Arc<Peer>>>,
    balancer: RoundRobin,
}

impl PeerPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_backends(backends: &[Backend]) -> Self {
        let pool = Self::new();
        for backend in backends {
            pool.add(&backend.host, backend.port);
        }
        pool
    }

    /// Add a peer. Returns `false` when `(host, port)` is already pooled.
    pub fn add(&self, host: &str, port: u16) -> bool {
        let mut peers = self.peers.write().unwrap_or_else(PoisonError::into_inner);
        if peers.iter().any(|peer| peer.is(host, port)) {
            return false;
        }
        peers.push(Arc::new(Peer::new(host, port)));
        true
    }

    /// Remove the first exact match. Returns `false` when nothing matched.
    pub fn remove(&self, host: &str, port: u16) -> bool {
        let mut peers = self.peers.write().unwrap_or_else(PoisonError::into_inner);
        match peers.iter().position(|peer| peer.is(host, port)) {
            Some(index) => {
                peers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Select the next peer. Pool size and cursor are read under the same lock.
    pub fn next(&self) -> Option<Arc<Peer>> {
        let peers = self.peers.read().unwrap_or_else(PoisonError::into_inner);
        self.balancer.next_peer(&peers)
    }

    pub fn snapshot(&self) -> Vec<Backend> {
        let peers = self.peers.read().unwrap_or_else(PoisonError::into_inner);
        peers.iter().map(|peer| peer.to_backend()).collect()
    }

    pub fn len(&self) -> usize {
        self.peers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports(pool: &PeerPool, n: usize) -> Vec<u16> {
        (0..n).map(|_| pool.next().unwrap().port).collect()
    }

    #[test]
    fn test_add_is_idempotent() {
        let pool = PeerPool::new();
        assert!(pool.add("127.0.0.1", 9100));
        assert!(!pool.add("127.0.0.1", 9100));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let pool = PeerPool::new();
        pool.add("127.0.0.1", 9100);
        assert!(!pool.remove("127.0.0.1", 9101));
        assert!(pool.remove("127.0.0.1", 9100));
        assert!(pool.is_empty());
        assert!(pool.next().is_none());
    }

    #[test]
    fn test_round_robin_in_insertion_order() {
        let pool = PeerPool::from_backends(&[
            Backend::new("127.0.0.1", 9100),
            Backend::new("127.0.0.1", 9101),
            Backend::new("127.0.0.1", 9102),
        ]);
        assert_eq!(ports(&pool, 3), vec![9100, 9101, 9102]);
    }

    #[test]
    fn test_selection_after_removal_stays_in_range() {
        let pool = PeerPool::from_backends(&[
            Backend::new("b", 0),
            Backend::new("b", 1),
            Backend::new("b", 2),
        ]);
        assert_eq!(ports(&pool, 3), vec![0, 1, 2]);
        pool.remove("b", 1);
        for _ in 0..10 {
            let port = pool.next().unwrap().port;
            assert!(port == 0 || port == 2);
        }
    }

    #[test]
    fn test_concurrent_selection_and_mutation() {
        let pool = Arc::new(PeerPool::from_backends(&[
            Backend::new("b", 0),
            Backend::new("b", 1),
        ]));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        let _ = pool.next();
                    }
                })
            })
            .collect();
        for i in 0..200u16 {
            pool.add("c", i);
            pool.remove("c", i);
        }
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(pool.len(), 2);
    }
}

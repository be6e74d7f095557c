//! Durable topology document.
//!
//! # Responsibilities
//! - Load the whole topology, bootstrapping `[]` on first use
//! - Save the whole topology in one transaction
//! - Count store operations by outcome

use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::observability::metrics;
use crate::store::engine::{KvEngine, StoreError};
use crate::store::lmdb::LmdbEngine;
use crate::store::memory::MemoryEngine;
use crate::topology::Topology;

/// Fixed key the topology document lives under.
pub const TOPOLOGY_KEY: &str = "proxy-topology";

const EMPTY_DOCUMENT: &[u8] = b"[]";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    engine: Arc<dyn KvEngine>,
}

impl ConfigStore {
    /// Open the LMDB-backed store described by `config`.
    pub fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let engine = LmdbEngine::open(&config.path, config.map_size, config.max_readers)?;
        Ok(Self::with_engine(Arc::new(engine)))
    }

    /// Store backed by a fresh [`MemoryEngine`].
    pub fn in_memory() -> Self {
        Self::with_engine(Arc::new(MemoryEngine::new()))
    }

    pub fn with_engine(engine: Arc<dyn KvEngine>) -> Self {
        Self { engine }
    }

    /// Read the full topology.
    pub fn load(&self) -> Result<Topology, StoreError> {
        let result = self
            .engine
            .get_or_insert(TOPOLOGY_KEY, EMPTY_DOCUMENT)
            .and_then(|bytes| serde_json::from_slice::<Topology>(&bytes).map_err(StoreError::from));
        Self::observe("load", &result);
        result
    }

    /// Overwrite the full topology.
    pub fn save(&self, topology: &Topology) -> Result<(), StoreError> {
        let result = serde_json::to_vec(topology)
            .map_err(StoreError::from)
            .and_then(|bytes| self.engine.put(TOPOLOGY_KEY, &bytes));
        Self::observe("save", &result);
        result
    }

    fn observe<T>(op: &'static str, result: &Result<T, StoreError>) {
        match result {
            Ok(_) => metrics::record_store_operation(op, "ok"),
            Err(e) => {
                tracing::error!(op, error = %e, "Topology store operation failed");
                metrics::record_store_operation(op, "error");
            }
        }
    }
}

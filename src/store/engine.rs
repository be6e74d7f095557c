//! Key-value engine contract.

use thiserror::Error;

/// Errors surfaced by the topology store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The LMDB environment or a transaction failed.
    #[error("storage engine error: {0}")]
    Engine(#[from] heed::Error),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document is not a valid topology.
    #[error("topology document error: {0}")]
    Document(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Narrow transactional key-value contract the store is written against.
///
/// Each call runs in its own transaction.
pub trait KvEngine: Send + Sync + std::fmt::Debug {
    /// Read `key`. A zero-length value is returned as-is.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Overwrite `key` and commit.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Read `key`; when absent or zero-length, write `default`, commit and
    /// return it.
    fn get_or_insert(&self, key: &str, default: &[u8]) -> Result<Vec<u8>, StoreError>;
}

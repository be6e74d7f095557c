//! In-memory engine for tests and ephemeral runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::store::engine::{KvEngine, StoreError};

#[derive(Debug, Default)]
pub struct MemoryEngine {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    unavailable: AtomicBool,
    fail_next_put: AtomicBool,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make only the next `put` fail. Reads keep working.
    pub fn fail_next_put(&self) {
        self.fail_next_put.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory engine switched off".into()));
        }
        Ok(())
    }
}

impl KvEngine for MemoryEngine {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.check()?;
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.check()?;
        if self.fail_next_put.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory engine put failed".into()));
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_or_insert(&self, key: &str, default: &[u8]) -> Result<Vec<u8>, StoreError> {
        self.check()?;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let value = entries.entry(key.to_string()).or_default();
        if value.is_empty() {
            *value = default.to_vec();
        }
        Ok(value.clone())
    }
}

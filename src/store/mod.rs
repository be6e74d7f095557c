//! Topology persistence.
//!
//! # Data Flow
//! ```text
//! Registry mutation
//!     → config_store.rs load() (read txn; first use writes `[]`)
//!     → mutate Topology in memory
//!     → config_store.rs save() (one write txn, whole document)
//!     → engine.rs KvEngine (lmdb.rs in production, memory.rs in tests)
//! ```
//!
//! # Design Decisions
//! - One JSON document under one fixed key
//! - Every load/save is its own transaction; callers own read-modify-write races
//! - The engine is a trait object so the registry never names LMDB

pub mod config_store;
pub mod engine;
pub mod lmdb;
pub mod memory;

pub use config_store::ConfigStore;
pub use engine::{KvEngine, StoreError};
pub use lmdb::LmdbEngine;
pub use memory::MemoryEngine;

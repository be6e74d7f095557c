//! LMDB engine backed by `heed`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};

use crate::store::engine::{KvEngine, StoreError};

/// Name of the LMDB sub-database holding the topology.
pub const DATABASE_NAME: &str = "aproxy";

/// LMDB environment with one named database.
#[derive(Clone)]
pub struct LmdbEngine {
    env: Env,
    db: Database<Str, Bytes>,
    path: PathBuf,
}

impl LmdbEngine {
    /// Open (creating if needed) the environment at `path`.
    pub fn open(path: &Path, map_size: usize, max_readers: u32) -> Result<Self, StoreError> {
        fs::create_dir_all(path)?;

        let mut options = EnvOpenOptions::new();
        options.map_size(map_size).max_readers(max_readers).max_dbs(4);
        // SAFETY: the environment is opened once per path by this process.
        let env = unsafe { options.open(path)? };

        let mut wtxn = env.write_txn()?;
        let db: Database<Str, Bytes> = env.create_database(&mut wtxn, Some(DATABASE_NAME))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, max_readers, "LMDB environment opened");

        Ok(Self {
            env,
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for LmdbEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LmdbEngine")
            .field("path", &self.path)
            .field("database", &DATABASE_NAME)
            .finish()
    }
}

impl KvEngine for LmdbEngine {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn()?;
        let value = self.db.get(&rtxn, key)?.map(<[u8]>::to_vec);
        Ok(value)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn()?;
        self.db.put(&mut wtxn, key, value)?;
        wtxn.commit()?;
        Ok(())
    }

    fn get_or_insert(&self, key: &str, default: &[u8]) -> Result<Vec<u8>, StoreError> {
        if let Some(value) = self.get(key)? {
            if !value.is_empty() {
                return Ok(value);
            }
        }

        // Re-check inside the write txn; writers are serialized by LMDB.
        let mut wtxn = self.env.write_txn()?;
        if let Some(value) = self.db.get(&wtxn, key)? {
            if !value.is_empty() {
                return Ok(value.to_vec());
            }
        }
        self.db.put(&mut wtxn, key, default)?;
        wtxn.commit()?;
        Ok(default.to_vec())
    }
}

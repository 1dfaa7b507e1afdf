//! Best-effort key-value persistence
//!
//! The Q-learning table, the trade history and the bear-market state are
//! written through a [`KeyValueStore`] injected at construction. Reads never
//! fail (a missing or unreadable entry is `None`); writes return a `Result`
//! that callers choose to log and drop.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::path::Path;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;

/// Minimal get/set/remove storage capability keyed by string
pub trait KeyValueStore: Send + Sync {
    /// Fetch the raw bytes stored under `key`
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete `key`; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// Build the store selected by configuration
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::File => Ok(Arc::new(FileStore::open(Path::new(&config.data_dir))?)),
    }
}

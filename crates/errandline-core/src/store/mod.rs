//! Persistent key-value storage.
//!
//! Everything the client persists (session fields, push-token bookkeeping,
//! cached API payloads) goes through the `KeyValueStore` trait as plain
//! string values under string keys. Two implementations are provided:
//!
//! - `FileStore`: one file per key in a directory, for on-device use
//! - `MemoryStore`: a process-local map, for tests and ephemeral sessions

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use anyhow::Result;

/// String-keyed, string-valued persistent storage.
///
/// Implementations must be safe to share across tasks. Individual operations
/// are atomic per key; there is no multi-key transaction.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// List all keys currently stored.
    fn keys(&self) -> Result<Vec<String>>;

    /// Read several keys as one logical snapshot.
    fn multi_get(&self, keys: &[&str]) -> Result<Vec<Option<String>>> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    /// Remove several keys. Every key is attempted; the first error is returned.
    fn multi_remove(&self, keys: &[&str]) -> Result<()> {
        let mut first_error = None;
        for key in keys {
            if let Err(e) = self.remove(key) {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

use crate::core::Result;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;

/// A single staged mutation of a [`KvStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOp {
    Set { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Byte-keyed, byte-valued store - allows pluggable storage backends
///
/// Holds no validation logic; callers own every decision about what is
/// written.
pub trait KvStore: Send + Sync {
    /// Get the value stored under `key`
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Apply every operation in `batch`, in order, or none of them.
    ///
    /// On `Err` the store must be left exactly as it was before the call.
    fn apply(&mut self, batch: Vec<WriteOp>) -> Result<()>;

    /// Insert or replace the value under `key`
    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.apply(vec![WriteOp::Set {
            key: key.to_vec(),
            value,
        }])
    }

    /// Remove `key`; removing an absent key is not an error
    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.apply(vec![WriteOp::Delete { key: key.to_vec() }])
    }

    /// Check if a key exists
    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Visit every entry whose key starts with `prefix`, in key order.
    ///
    /// Stops as soon as `visit` returns `ControlFlow::Break`. Each call starts
    /// a fresh scan.
    fn iterate(
        &self,
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> ControlFlow<()>,
    ) -> Result<()>;

    /// Make every applied write durable. Volatile stores have nothing to do.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

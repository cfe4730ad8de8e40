use super::{KvStore, WriteOp};
use crate::core::Result;
use std::collections::BTreeMap;
use std::ops::{Bound, ControlFlow};

/// Ordered in-memory map; prefix scans are range scans over the key order.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot of entries (for crash recovery)
    pub fn from_entries(entries: BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        Self { entries }
    }

    /// All entries (for persistence snapshots)
    pub fn entries(&self) -> &BTreeMap<Vec<u8>, Vec<u8>> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply one operation directly to the map (also used for WAL replay)
    pub fn apply_op(&mut self, op: WriteOp) {
        match op {
            WriteOp::Set { key, value } => {
                self.entries.insert(key, value);
            }
            WriteOp::Delete { key } => {
                self.entries.remove(&key);
            }
        }
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn apply(&mut self, batch: Vec<WriteOp>) -> Result<()> {
        for op in batch {
            self.apply_op(op);
        }
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.entries.contains_key(key))
    }

    fn iterate(
        &self,
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> ControlFlow<()>,
    ) -> Result<()> {
        let range = self
            .entries
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded));
        for (key, value) in range {
            if !key.starts_with(prefix) {
                break;
            }
            if visit(key, value).is_break() {
                break;
            }
        }
        Ok(())
    }
}

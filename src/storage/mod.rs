pub mod engine;
pub mod entity;
pub mod memory;
pub mod persistence;

pub use engine::{KvStore, WriteOp};
pub use entity::{Entity, EntityBatch, EntityStore};
pub use memory::MemoryKvStore;
pub use persistence::{DurabilityMode, DurableKvStore, SnapshotManager, WalEntry, WalManager};

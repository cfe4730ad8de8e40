use crate::storage::DurabilityMode;
use std::path::{Path, PathBuf};

/// What happens to record specifications when their contract specification
/// is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContractSpecDeletePolicy {
    /// Refuse the delete while any record specification remains.
    #[default]
    Reject,
    /// Delete the record specifications in the same mutation.
    Cascade,
}

/// Keeper configuration
#[derive(Debug, Clone)]
pub struct KeeperConfig {
    /// Contract specification delete behavior
    pub contract_spec_delete: ContractSpecDeletePolicy,

    /// Remove a session once its last record is deleted
    pub prune_empty_sessions: bool,

    /// Directory for the WAL and snapshot (in-memory only when unset)
    pub data_dir: Option<PathBuf>,

    /// WAL durability for the on-disk store
    pub durability: DurabilityMode,

    /// WAL entries between automatic snapshots
    pub checkpoint_threshold: usize,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            contract_spec_delete: ContractSpecDeletePolicy::Reject,
            prune_empty_sessions: false,
            data_dir: None,
            durability: DurabilityMode::Async,
            checkpoint_threshold: 1000,
        }
    }
}

impl KeeperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the contract specification delete policy
    pub fn contract_spec_delete(mut self, policy: ContractSpecDeletePolicy) -> Self {
        self.contract_spec_delete = policy;
        self
    }

    /// Enable implicit session cleanup after record deletion
    pub fn prune_empty_sessions(mut self, enabled: bool) -> Self {
        self.prune_empty_sessions = enabled;
        self
    }

    /// Persist to `dir`
    pub fn data_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.data_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set WAL durability
    pub fn durability(mut self, mode: DurabilityMode) -> Self {
        self.durability = mode;
        self
    }

    /// Set WAL entries between snapshots (minimum 1)
    pub fn checkpoint_threshold(mut self, entries: usize) -> Self {
        self.checkpoint_threshold = entries.max(1);
        self
    }
}

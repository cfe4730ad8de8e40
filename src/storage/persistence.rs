//! Write-Ahead Logging (WAL) and snapshot persistence for the key-value store

use super::{KvStore, MemoryKvStore, WriteOp};
use crate::core::{MetaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{Level, event};

const WAL_FILE: &str = "metaledger.wal";
const SNAPSHOT_FILE: &str = "metaledger.snapshot";
const SNAPSHOT_VERSION: u32 = 1;

// ============================================================================
// WAL Entry Types
// ============================================================================

/// One WAL frame. A frame is replayed whole or not at all, so a batch is
/// the unit of atomicity across a crash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalEntry {
    Set { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
    Batch(Vec<WriteOp>),
}

impl WalEntry {
    pub fn into_ops(self) -> Vec<WriteOp> {
        match self {
            WalEntry::Set { key, value } => vec![WriteOp::Set { key, value }],
            WalEntry::Delete { key } => vec![WriteOp::Delete { key }],
            WalEntry::Batch(ops) => ops,
        }
    }
}

impl From<Vec<WriteOp>> for WalEntry {
    fn from(mut ops: Vec<WriteOp>) -> Self {
        if ops.len() == 1
            && let Some(op) = ops.pop()
        {
            return match op {
                WriteOp::Set { key, value } => WalEntry::Set { key, value },
                WriteOp::Delete { key } => WalEntry::Delete { key },
            };
        }
        WalEntry::Batch(ops)
    }
}

// ============================================================================
// Store Snapshot
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub created_at: u64,
    pub entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl StoreSnapshot {
    pub fn new(entries: BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            version: SNAPSHOT_VERSION,
            created_at,
            entries,
        }
    }
}

// ============================================================================
// Durability Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// fsync after every WAL append
    Sync,
    /// flush to the OS after every append
    #[default]
    Async,
    /// no WAL; snapshots only on explicit checkpoint
    None,
}

// ============================================================================
// WAL Manager
// ============================================================================

pub struct WalManager {
    wal_path: PathBuf,
    wal_file: Option<BufWriter<File>>,
    durability_mode: DurabilityMode,
    entries_since_checkpoint: usize,
    /// Length of the log up to the end of the last complete frame
    valid_len: u64,
}

impl WalManager {
    pub fn new<P: AsRef<Path>>(wal_path: P, durability_mode: DurabilityMode) -> Result<Self> {
        let wal_path = wal_path.as_ref().to_path_buf();
        if let Some(parent) = wal_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let wal_file = if durability_mode != DurabilityMode::None {
            let file = OpenOptions::new().create(true).append(true).open(&wal_path)?;
            Some(BufWriter::new(file))
        } else {
            None
        };
        let valid_len = match fs::metadata(&wal_path) {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };

        Ok(Self {
            wal_path,
            wal_file,
            durability_mode,
            entries_since_checkpoint: 0,
            valid_len,
        })
    }

    /// Append one frame. On failure the log is cut back to its previous
    /// length so a partial frame never precedes later appends.
    pub fn append(&mut self, entry: &WalEntry) -> Result<()> {
        if self.durability_mode == DurabilityMode::None {
            return Ok(());
        }
        let serialized = rmp_serde::to_vec(entry)?;
        let mut frame = Vec::with_capacity(4 + serialized.len());
        frame.extend_from_slice(&(serialized.len() as u32).to_le_bytes());
        frame.extend_from_slice(&serialized);

        if let Err(err) = self.write_frame(&frame) {
            event!(Level::WARN, error = %err, path = %self.wal_path.display(), "WAL append failed");
            self.wal_file = None;
            self.truncate_to(self.valid_len)?;
            self.reopen()?;
            return Err(err);
        }
        self.valid_len += frame.len() as u64;
        self.entries_since_checkpoint += 1;
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let file = self
            .wal_file
            .as_mut()
            .ok_or_else(|| MetaError::Io("WAL file not initialized".to_string()))?;
        file.write_all(frame)?;
        file.flush()?;
        if self.durability_mode == DurabilityMode::Sync {
            file.get_mut().sync_all()?;
        }
        Ok(())
    }

    /// Read every complete frame; a torn trailing frame ends the log.
    pub fn read_all(&self) -> Result<Vec<WalEntry>> {
        Ok(self.read_frames()?.0)
    }

    /// Read the log for replay and cut off a torn trailing frame, so later
    /// appends start on a frame boundary.
    pub fn recover(&mut self) -> Result<Vec<WalEntry>> {
        let (entries, valid_len) = self.read_frames()?;
        if self.wal_path.exists() && fs::metadata(&self.wal_path)?.len() > valid_len {
            event!(
                Level::WARN,
                path = %self.wal_path.display(),
                valid_len,
                "truncating torn WAL tail"
            );
            self.truncate_to(valid_len)?;
        }
        self.valid_len = valid_len;
        Ok(entries)
    }

    fn read_frames(&self) -> Result<(Vec<WalEntry>, u64)> {
        if !self.wal_path.exists() {
            return Ok((Vec::new(), 0));
        }
        let file = File::open(&self.wal_path)?;
        let mut reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut valid_len = 0u64;
        loop {
            let mut len_bytes = [0u8; 4];
            match reader.read_exact(&mut len_bytes) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let len = u32::from_le_bytes(len_bytes) as usize;
            let mut data = vec![0u8; len];
            match reader.read_exact(&mut data) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    event!(Level::WARN, path = %self.wal_path.display(), "truncated WAL frame ignored");
                    break;
                }
                Err(e) => return Err(e.into()),
            }
            entries.push(rmp_serde::from_slice(&data)?);
            valid_len += 4 + len as u64;
        }
        Ok((entries, valid_len))
    }

    /// Empty the log. Runs in every mode, so a log left by an earlier
    /// durable run cannot be replayed over a newer snapshot.
    pub fn clear(&mut self) -> Result<()> {
        self.wal_file = None;
        if self.durability_mode == DurabilityMode::None {
            if self.wal_path.exists() {
                fs::remove_file(&self.wal_path)?;
            }
        } else {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.wal_path)?;
            drop(file);
            self.reopen()?;
        }
        self.entries_since_checkpoint = 0;
        self.valid_len = 0;
        Ok(())
    }

    pub fn entries_since_checkpoint(&self) -> usize {
        self.entries_since_checkpoint
    }

    fn truncate_to(&self, len: u64) -> Result<()> {
        if !self.wal_path.exists() {
            return Ok(());
        }
        let file = OpenOptions::new().write(true).open(&self.wal_path)?;
        file.set_len(len)?;
        file.sync_all()?;
        Ok(())
    }

    fn reopen(&mut self) -> Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&self.wal_path)?;
        self.wal_file = Some(BufWriter::new(file));
        Ok(())
    }
}

// ============================================================================
// Snapshot Manager
// ============================================================================

pub struct SnapshotManager {
    snapshot_path: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    /// Write to a sibling temp file, sync, then rename over the snapshot.
    pub fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        if let Some(parent) = self.snapshot_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = self.snapshot_path.with_extension("tmp");
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        let serialized = rmp_serde::to_vec(snapshot)?;
        writer.write_all(&serialized)?;
        writer.flush()?;
        writer.get_mut().sync_all()?;
        fs::rename(&temp_path, &self.snapshot_path)?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<StoreSnapshot>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let mut data = Vec::new();
        File::open(&self.snapshot_path)?.read_to_end(&mut data)?;
        let snapshot: StoreSnapshot = rmp_serde::from_slice(&data)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(MetaError::Serialization(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(Some(snapshot))
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path.exists()
    }
}

// ============================================================================
// Durable Store
// ============================================================================

/// In-memory map backed by a WAL and periodic snapshots.
///
/// Every batch is appended to the WAL before it touches memory, so memory
/// never runs ahead of the log.
pub struct DurableKvStore {
    memory: MemoryKvStore,
    wal: WalManager,
    snapshot: SnapshotManager,
    checkpoint_threshold: usize,
}

impl DurableKvStore {
    /// Open (or create) a store in `data_dir`, recovering snapshot + WAL.
    pub fn open<P: AsRef<Path>>(
        data_dir: P,
        durability_mode: DurabilityMode,
        checkpoint_threshold: usize,
    ) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let mut wal = WalManager::new(data_dir.join(WAL_FILE), durability_mode)?;
        let snapshot = SnapshotManager::new(data_dir.join(SNAPSHOT_FILE));

        let entries = snapshot.load()?.map(|s| s.entries).unwrap_or_default();
        let mut memory = MemoryKvStore::from_entries(entries);
        let replayed = wal.recover()?;
        let replay_count = replayed.len();
        for entry in replayed {
            for op in entry.into_ops() {
                memory.apply_op(op);
            }
        }
        event!(
            Level::INFO,
            path = %data_dir.display(),
            entries = memory.len(),
            replayed = replay_count,
            "durable store recovered"
        );

        Ok(Self {
            memory,
            wal,
            snapshot,
            checkpoint_threshold: checkpoint_threshold.max(1),
        })
    }

    /// Snapshot the current entries and truncate the WAL.
    pub fn checkpoint(&mut self) -> Result<()> {
        let snapshot = StoreSnapshot::new(self.memory.entries().clone());
        self.snapshot.save(&snapshot)?;
        self.wal.clear()?;
        event!(Level::DEBUG, entries = snapshot.entries.len(), "store checkpoint written");
        Ok(())
    }

    pub fn wal(&self) -> &WalManager {
        &self.wal
    }

    pub fn snapshot(&self) -> &SnapshotManager {
        &self.snapshot
    }
}

impl KvStore for DurableKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.memory.get(key)
    }

    fn apply(&mut self, batch: Vec<WriteOp>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let entry = WalEntry::from(batch);
        self.wal.append(&entry)?;
        for op in entry.into_ops() {
            self.memory.apply_op(op);
        }

        // The batch is already in the WAL; a failed snapshot only delays
        // compaction.
        if self.wal.entries_since_checkpoint() >= self.checkpoint_threshold
            && let Err(err) = self.checkpoint()
        {
            event!(Level::WARN, error = %err, "automatic checkpoint failed");
        }
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        self.memory.exists(key)
    }

    fn iterate(
        &self,
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> ControlFlow<()>,
    ) -> Result<()> {
        self.memory.iterate(prefix, visit)
    }

    fn flush(&mut self) -> Result<()> {
        self.checkpoint()
    }
}

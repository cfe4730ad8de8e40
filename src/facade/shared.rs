use super::{GenesisState, MetadataKeeper};
use crate::address::MetadataAddress;
use crate::core::{Record, Result, Scope, Session};
use crate::handler::{MetadataEvent, MetadataMsg};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cloneable handle sharing one [`MetadataKeeper`] between tasks.
///
/// Messages take the write lock for their whole validate-then-write cycle,
/// so mutations are applied one at a time. Queries share the read lock.
#[derive(Clone)]
pub struct SharedKeeper {
    inner: Arc<RwLock<MetadataKeeper>>,
}

impl SharedKeeper {
    pub fn new(keeper: MetadataKeeper) -> Self {
        Self {
            inner: Arc::new(RwLock::new(keeper)),
        }
    }

    pub async fn handle(&self, msg: MetadataMsg) -> Result<Vec<MetadataEvent>> {
        self.inner.write().await.handle(msg)
    }

    /// Run a read-only closure against the keeper.
    pub async fn read<R>(&self, f: impl FnOnce(&MetadataKeeper) -> R) -> R {
        let keeper = self.inner.read().await;
        f(&keeper)
    }

    pub async fn scope(&self, scope_id: &MetadataAddress) -> Result<Option<Scope>> {
        self.inner.read().await.scope(scope_id)
    }

    pub async fn session(&self, session_id: &MetadataAddress) -> Result<Option<Session>> {
        self.inner.read().await.session(session_id)
    }

    pub async fn record(&self, record_id: &MetadataAddress) -> Result<Option<Record>> {
        self.inner.read().await.record(record_id)
    }

    pub async fn checkpoint(&self) -> Result<()> {
        self.inner.write().await.checkpoint()
    }

    pub async fn export_genesis(&self) -> Result<GenesisState> {
        self.inner.read().await.export_genesis()
    }
}

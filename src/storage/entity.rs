use super::{KvStore, WriteOp};
use crate::address::{AddressKind, MetadataAddress};
use crate::core::{
    ContractSpecification, MetaError, Record, RecordSpecification, Result, Scope,
    ScopeSpecification, Session,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::ops::ControlFlow;

/// A value persisted under its own metadata address.
pub trait Entity: Serialize + DeserializeOwned {
    const KIND: AddressKind;

    fn address(&self) -> Result<MetadataAddress>;
}

impl Entity for Scope {
    const KIND: AddressKind = AddressKind::Scope;

    fn address(&self) -> Result<MetadataAddress> {
        Ok(self.scope_id)
    }
}

impl Entity for Session {
    const KIND: AddressKind = AddressKind::Session;

    fn address(&self) -> Result<MetadataAddress> {
        Ok(self.session_id)
    }
}

impl Entity for Record {
    const KIND: AddressKind = AddressKind::Record;

    fn address(&self) -> Result<MetadataAddress> {
        self.record_id()
    }
}

impl Entity for ScopeSpecification {
    const KIND: AddressKind = AddressKind::ScopeSpecification;

    fn address(&self) -> Result<MetadataAddress> {
        Ok(self.specification_id)
    }
}

impl Entity for ContractSpecification {
    const KIND: AddressKind = AddressKind::ContractSpecification;

    fn address(&self) -> Result<MetadataAddress> {
        Ok(self.specification_id)
    }
}

impl Entity for RecordSpecification {
    const KIND: AddressKind = AddressKind::RecordSpecification;

    fn address(&self) -> Result<MetadataAddress> {
        Ok(self.specification_id)
    }
}

/// Entity writes staged for one atomic commit.
#[derive(Debug, Default)]
pub struct EntityBatch {
    ops: Vec<WriteOp>,
}

impl EntityBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `entity` under its own address.
    pub fn put<E: Entity>(&mut self, entity: &E) -> Result<MetadataAddress> {
        let address = entity.address()?;
        if !address.is_kind(E::KIND) {
            return Err(MetaError::MalformedAddress(format!(
                "cannot store {} under a {} address",
                E::KIND,
                address.kind()
            )));
        }
        self.ops.push(WriteOp::Set {
            key: address.to_bytes(),
            value: rmp_serde::to_vec(entity)?,
        });
        Ok(address)
    }

    pub fn remove(&mut self, address: &MetadataAddress) {
        self.ops.push(WriteOp::Delete {
            key: address.to_bytes(),
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Typed access to metadata entities over a byte-oriented [`KvStore`].
///
/// Entities are MessagePack-encoded and keyed by their address bytes.
pub struct EntityStore {
    kv: Box<dyn KvStore>,
}

impl EntityStore {
    pub fn new(kv: Box<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.kv.flush()
    }

    /// Apply every staged write, or none of them.
    pub fn commit(&mut self, batch: EntityBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.kv.apply(batch.ops)
    }

    /// Load the entity at `address`; an address of another kind is absent.
    pub fn get<E: Entity>(&self, address: &MetadataAddress) -> Result<Option<E>> {
        if !address.is_kind(E::KIND) {
            return Ok(None);
        }
        match self.kv.get(&address.to_bytes())? {
            Some(bytes) => Ok(Some(rmp_serde::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn exists(&self, address: &MetadataAddress) -> Result<bool> {
        self.kv.exists(&address.to_bytes())
    }

    /// Store the entity under its address; returns whether it replaced one.
    #[cfg(test)]
    pub(crate) fn put<E: Entity>(&mut self, entity: &E) -> Result<bool> {
        let mut batch = EntityBatch::new();
        let address = batch.put(entity)?;
        let existed = self.exists(&address)?;
        self.commit(batch)?;
        Ok(existed)
    }

    #[cfg(test)]
    pub(crate) fn remove(&mut self, address: &MetadataAddress) -> Result<()> {
        let mut batch = EntityBatch::new();
        batch.remove(address);
        self.commit(batch)
    }

    /// Decode and visit every entity of type `E` under `prefix`.
    pub fn iterate<E: Entity>(
        &self,
        prefix: &[u8],
        mut visit: impl FnMut(E) -> ControlFlow<()>,
    ) -> Result<()> {
        let mut failure = None;
        self.kv.iterate(prefix, &mut |key, value| {
            if key.first() != Some(&E::KIND.tag()) {
                return ControlFlow::Continue(());
            }
            match rmp_serde::from_slice::<E>(value) {
                Ok(entity) => visit(entity),
                Err(err) => {
                    failure = Some(MetaError::from(err));
                    ControlFlow::Break(())
                }
            }
        })?;
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn collect<E: Entity>(&self, prefix: &[u8]) -> Result<Vec<E>> {
        let mut out = Vec::new();
        self.iterate(prefix, |entity: E| {
            out.push(entity);
            ControlFlow::Continue(())
        })?;
        Ok(out)
    }

    pub fn all<E: Entity>(&self) -> Result<Vec<E>> {
        self.collect(&MetadataAddress::kind_prefix(E::KIND))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Party, PartyType};
    use crate::storage::MemoryKvStore;
    use uuid::Uuid;

    fn scope(n: u8) -> Scope {
        Scope::new(
            MetadataAddress::scope(Uuid::from_bytes([n; 16])),
            vec![Party::new("alice", PartyType::Owner)],
        )
    }

    #[test]
    fn test_put_get_remove() {
        let mut store = EntityStore::new(Box::new(MemoryKvStore::new()));
        let s = scope(1);
        assert!(!store.put(&s).unwrap());
        assert!(store.put(&s).unwrap());
        assert_eq!(store.get::<Scope>(&s.scope_id).unwrap(), Some(s.clone()));

        store.remove(&s.scope_id).unwrap();
        assert_eq!(store.get::<Scope>(&s.scope_id).unwrap(), None);
    }

    #[test]
    fn test_get_with_wrong_kind_is_absent() {
        let mut store = EntityStore::new(Box::new(MemoryKvStore::new()));
        let s = scope(1);
        store.put(&s).unwrap();
        assert_eq!(store.get::<Session>(&s.scope_id).unwrap(), None);
    }

    #[test]
    fn test_all_returns_only_one_kind() {
        let mut store = EntityStore::new(Box::new(MemoryKvStore::new()));
        store.put(&scope(1)).unwrap();
        store.put(&scope(2)).unwrap();
        assert_eq!(store.all::<Scope>().unwrap().len(), 2);
        assert!(store.all::<Session>().unwrap().is_empty());
    }

    #[test]
    fn test_commit_applies_batch() {
        let mut store = EntityStore::new(Box::new(MemoryKvStore::new()));
        store.put(&scope(1)).unwrap();

        let mut batch = EntityBatch::new();
        batch.put(&scope(2)).unwrap();
        batch.remove(&scope(1).scope_id);
        assert_eq!(batch.len(), 2);
        assert!(store.get::<Scope>(&scope(2).scope_id).unwrap().is_none());

        store.commit(batch).unwrap();
        assert!(store.get::<Scope>(&scope(1).scope_id).unwrap().is_none());
        assert!(store.get::<Scope>(&scope(2).scope_id).unwrap().is_some());
    }
}

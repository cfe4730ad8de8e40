//! Read-only lookups of the specifications entities must conform to.
//!
//! Lookups never fail on absence: "not found" is `Ok(None)`, and the caller
//! decides whether absence is an error (it is not, for creation flows).

use crate::address::{AddressKind, MetadataAddress};
use crate::core::{
    ContractSpecification, MetaError, RecordSpecification, Result, ScopeSpecification,
};
use crate::storage::EntityStore;

#[derive(Clone, Copy)]
pub struct SpecResolver<'a> {
    store: &'a EntityStore,
}

impl<'a> SpecResolver<'a> {
    pub fn new(store: &'a EntityStore) -> Self {
        Self { store }
    }

    pub fn resolve_contract_spec(
        &self,
        address: &MetadataAddress,
    ) -> Result<Option<ContractSpecification>> {
        self.store.get(address)
    }

    pub fn resolve_record_spec(
        &self,
        address: &MetadataAddress,
    ) -> Result<Option<RecordSpecification>> {
        self.store.get(address)
    }

    pub fn resolve_scope_spec(
        &self,
        address: &MetadataAddress,
    ) -> Result<Option<ScopeSpecification>> {
        self.store.get(address)
    }

    /// Record specification named `name` under a contract specification.
    pub fn resolve_record_spec_by_name(
        &self,
        contract_spec: &MetadataAddress,
        name: &str,
    ) -> Result<Option<RecordSpecification>> {
        let contract_spec = contract_spec.contract_spec_address()?;
        let address = MetadataAddress::record_specification(contract_spec.primary_uuid(), name)?;
        self.resolve_record_spec(&address)
    }

    pub fn record_specs_for_contract_spec(
        &self,
        contract_spec: &MetadataAddress,
    ) -> Result<Vec<RecordSpecification>> {
        self.store
            .collect(&contract_spec.contract_spec_record_spec_prefix()?)
    }
}

/// Parent contract specification of a record specification.
///
/// A pure function of the address layout; no store lookup.
pub fn record_spec_parent(record_spec: &MetadataAddress) -> Result<MetadataAddress> {
    if !record_spec.is_kind(AddressKind::RecordSpecification) {
        return Err(MetaError::InvalidInputKind(format!(
            "expected a record specification address, got {}",
            record_spec.kind()
        )));
    }
    record_spec.contract_spec_address()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ContractSource, DefinitionType, PartyType};
    use crate::storage::MemoryKvStore;
    use uuid::Uuid;

    fn contract_spec(uuid: Uuid) -> ContractSpecification {
        ContractSpecification {
            specification_id: MetadataAddress::contract_specification(uuid),
            description: None,
            owner_addresses: vec!["alice".into()],
            parties_involved: vec![PartyType::Owner],
            source: ContractSource::Hash("deadbeef".to_string()),
            class_name: "LoanContract".to_string(),
        }
    }

    fn record_spec(parent: Uuid, name: &str) -> RecordSpecification {
        RecordSpecification {
            specification_id: MetadataAddress::record_specification(parent, name).unwrap(),
            name: name.to_string(),
            inputs: Vec::new(),
            type_name: "string".to_string(),
            result_type: DefinitionType::Record,
            responsible_parties: vec![PartyType::Owner],
        }
    }

    #[test]
    fn test_missing_specs_resolve_to_none() {
        let store = EntityStore::new(Box::new(MemoryKvStore::new()));
        let resolver = SpecResolver::new(&store);
        let id = MetadataAddress::contract_specification(Uuid::from_bytes([1; 16]));
        assert!(resolver.resolve_contract_spec(&id).unwrap().is_none());
        assert!(resolver.record_specs_for_contract_spec(&id).unwrap().is_empty());
    }

    #[test]
    fn test_record_specs_are_scoped_to_their_parent() {
        let parent = Uuid::from_bytes([1; 16]);
        let other = Uuid::from_bytes([2; 16]);
        let mut store = EntityStore::new(Box::new(MemoryKvStore::new()));
        store.put(&contract_spec(parent)).unwrap();
        store.put(&record_spec(parent, "a")).unwrap();
        store.put(&record_spec(parent, "b")).unwrap();
        store.put(&record_spec(other, "a")).unwrap();

        let resolver = SpecResolver::new(&store);
        let parent_id = MetadataAddress::contract_specification(parent);
        assert_eq!(resolver.record_specs_for_contract_spec(&parent_id).unwrap().len(), 2);
        assert!(resolver.resolve_record_spec_by_name(&parent_id, "B").unwrap().is_some());
        assert!(resolver.resolve_contract_spec(&parent_id).unwrap().is_some());
    }

    #[test]
    fn test_record_spec_parent() {
        let child = MetadataAddress::record_specification(Uuid::from_bytes([4; 16]), "x").unwrap();
        assert_eq!(
            record_spec_parent(&child).unwrap(),
            MetadataAddress::contract_specification(Uuid::from_bytes([4; 16]))
        );
        assert!(record_spec_parent(&MetadataAddress::scope(Uuid::nil())).is_err());
    }
}

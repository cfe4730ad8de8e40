use super::MetadataKeeper;
use crate::address::MetadataAddress;
use crate::core::{
    ContractSpecification, MetaError, Record, RecordSpecification, Result, Scope,
    ScopeSpecification, Session,
};
use crate::spec::record_spec_parent;
use crate::storage::{Entity, EntityBatch};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{Level, event, info_span};

/// Full contents of a keeper, for export and bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    #[serde(default)]
    pub scopes: Vec<Scope>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub scope_specifications: Vec<ScopeSpecification>,
    #[serde(default)]
    pub contract_specifications: Vec<ContractSpecification>,
    #[serde(default)]
    pub record_specifications: Vec<RecordSpecification>,
}

impl GenesisState {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
            + self.sessions.len()
            + self.records.len()
            + self.scope_specifications.len()
            + self.contract_specifications.len()
            + self.record_specifications.len()
    }

    /// Field-level checks on every entity, plus address uniqueness.
    ///
    /// Signature and party rules are not applied: genesis state is trusted
    /// to have passed them when it was built. References are checked on
    /// import, where the target store is known.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.len());
        let mut check = |address: MetadataAddress| {
            if seen.insert(address) {
                Ok(())
            } else {
                Err(MetaError::InvalidEntity(format!(
                    "duplicate genesis entry for {}",
                    address
                )))
            }
        };

        for spec in &self.contract_specifications {
            spec.validate_basic()?;
            check(spec.address()?)?;
        }
        for spec in &self.record_specifications {
            spec.validate_basic()?;
            if spec.expected_id()? != spec.specification_id {
                return Err(MetaError::InvalidEntity(format!(
                    "record specification '{}' is not stored at its derived address",
                    spec.name
                )));
            }
            check(spec.address()?)?;
        }
        for spec in &self.scope_specifications {
            spec.validate_basic()?;
            check(spec.address()?)?;
        }
        for scope in &self.scopes {
            scope.validate_basic()?;
            check(scope.address()?)?;
        }
        for session in &self.sessions {
            session.validate_basic()?;
            check(session.address()?)?;
        }
        for record in &self.records {
            record.validate_basic()?;
            check(record.address()?)?;
        }
        Ok(())
    }

    /// Addresses of every entity in the state.
    pub fn addresses(&self) -> Result<HashSet<MetadataAddress>> {
        let mut addresses = HashSet::with_capacity(self.len());
        for spec in &self.contract_specifications {
            addresses.insert(spec.address()?);
        }
        for spec in &self.record_specifications {
            addresses.insert(spec.address()?);
        }
        for spec in &self.scope_specifications {
            addresses.insert(spec.address()?);
        }
        for scope in &self.scopes {
            addresses.insert(scope.address()?);
        }
        for session in &self.sessions {
            addresses.insert(session.address()?);
        }
        for record in &self.records {
            addresses.insert(record.address()?);
        }
        Ok(addresses)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl MetadataKeeper {
    pub fn export_genesis(&self) -> Result<GenesisState> {
        let store = self.store();
        Ok(GenesisState {
            scopes: store.all()?,
            sessions: store.all()?,
            records: store.all()?,
            scope_specifications: store.all()?,
            contract_specifications: store.all()?,
            record_specifications: store.all()?,
        })
    }

    /// Load `genesis` into the store, parents before children. Returns the
    /// number of entities written. Nothing is written if validation fails.
    ///
    /// Every reference must resolve to an entity in `genesis` or already in
    /// the store: record specifications need their contract specification,
    /// sessions their scope and contract specification, records their
    /// session.
    pub fn import_genesis(&mut self, genesis: &GenesisState) -> Result<usize> {
        let span = info_span!("metadata.genesis.import", entities = genesis.len());
        let _enter = span.enter();

        if let Err(err) = genesis
            .validate()
            .and_then(|()| self.check_genesis_references(genesis))
        {
            event!(Level::WARN, error = %err, "genesis rejected");
            return Err(err);
        }

        let mut batch = EntityBatch::new();
        for spec in &genesis.contract_specifications {
            batch.put(spec)?;
        }
        for spec in &genesis.record_specifications {
            batch.put(spec)?;
        }
        for spec in &genesis.scope_specifications {
            batch.put(spec)?;
        }
        for scope in &genesis.scopes {
            batch.put(scope)?;
        }
        for session in &genesis.sessions {
            batch.put(session)?;
        }
        for record in &genesis.records {
            batch.put(record)?;
        }
        self.store_mut().commit(batch)?;

        event!(Level::INFO, "genesis imported");
        Ok(genesis.len())
    }

    fn check_genesis_references(&self, genesis: &GenesisState) -> Result<()> {
        let known = genesis.addresses()?;
        let store = self.store();
        let present = |address: &MetadataAddress| -> Result<bool> {
            Ok(known.contains(address) || store.exists(address)?)
        };

        for spec in &genesis.record_specifications {
            let parent = record_spec_parent(&spec.specification_id)?;
            if !present(&parent)? {
                return Err(MetaError::ParentSpecificationNotFound {
                    parent,
                    child: spec.specification_id,
                });
            }
        }
        for spec in &genesis.scope_specifications {
            for contract_spec_id in &spec.contract_spec_ids {
                if !present(contract_spec_id)? {
                    return Err(MetaError::SpecificationNotFound(*contract_spec_id));
                }
            }
        }
        for session in &genesis.sessions {
            let scope_id = session.scope_address()?;
            if !present(&scope_id)? {
                return Err(MetaError::ScopeNotFound(scope_id));
            }
            if !present(&session.specification_id)? {
                return Err(MetaError::SpecificationNotFound(session.specification_id));
            }
        }
        for record in &genesis.records {
            if !present(&record.session_id)? {
                return Err(MetaError::SessionNotFound(record.session_id));
            }
        }
        Ok(())
    }
}

use super::{MutationValidator, require_same_identity};
use crate::address::{AddressKind, MetadataAddress};
use crate::auth;
use crate::config::ContractSpecDeletePolicy;
use crate::core::{
    AccountAddress, ContractSpecification, MetaError, RecordSpecification, Result, Scope,
    ScopeSpecification, Session,
};
use crate::spec::record_spec_parent;
use std::ops::ControlFlow;

impl MutationValidator<'_> {
    /// Validate a scope specification create or update.
    ///
    /// Updates need every existing owner; creates need every proposed owner.
    /// Every listed contract specification must exist.
    pub fn validate_scope_spec_update(
        &self,
        existing: Option<&ScopeSpecification>,
        proposed: &ScopeSpecification,
        signers: &[AccountAddress],
    ) -> Result<()> {
        auth::require_non_empty(signers)?;
        if let Some(existing) = existing {
            require_same_identity(&existing.specification_id, &proposed.specification_id)?;
        }
        proposed.validate_basic()?;
        let owners = existing.map_or(&proposed.owner_addresses, |e| &e.owner_addresses);
        auth::require_all_owners_signed(owners, signers)?;

        for contract_spec_id in &proposed.contract_spec_ids {
            self.require_contract_spec(contract_spec_id)?;
        }
        Ok(())
    }

    /// Validate a contract specification create or update.
    pub fn validate_contract_spec_update(
        &self,
        existing: Option<&ContractSpecification>,
        proposed: &ContractSpecification,
        signers: &[AccountAddress],
    ) -> Result<()> {
        auth::require_non_empty(signers)?;
        if let Some(existing) = existing {
            require_same_identity(&existing.specification_id, &proposed.specification_id)?;
        }
        proposed.validate_basic()?;
        let owners = existing.map_or(&proposed.owner_addresses, |e| &e.owner_addresses);
        auth::require_all_owners_signed(owners, signers)
    }

    /// Validate a record specification create or update.
    ///
    /// The parent contract specification (read from the address) must exist
    /// and its owners must sign; the name must hash to the address.
    pub fn validate_record_spec_update(
        &self,
        existing: Option<&RecordSpecification>,
        proposed: &RecordSpecification,
        signers: &[AccountAddress],
    ) -> Result<()> {
        auth::require_non_empty(signers)?;
        if let Some(existing) = existing {
            require_same_identity(&existing.specification_id, &proposed.specification_id)?;
        }
        proposed.validate_basic()?;
        require_same_identity(&proposed.expected_id()?, &proposed.specification_id)?;

        let parent = self.require_parent_contract_spec(&proposed.specification_id)?;
        auth::require_all_owners_signed(&parent.owner_addresses, signers)
    }

    /// Validate removal of a scope specification: owners sign and no scope
    /// still references it.
    pub fn validate_scope_spec_remove(
        &self,
        existing: Option<&ScopeSpecification>,
        spec_id: &MetadataAddress,
        signers: &[AccountAddress],
    ) -> Result<()> {
        let existing = existing.ok_or(MetaError::SpecificationNotFound(*spec_id))?;
        require_same_identity(&existing.specification_id, spec_id)?;
        auth::require_signers_cover(&existing.owner_addresses, signers)?;

        let mut dependents = 0;
        self.store.iterate(
            &MetadataAddress::kind_prefix(AddressKind::Scope),
            |scope: Scope| {
                if scope.specification_id.as_ref() == Some(spec_id) {
                    dependents += 1;
                }
                ControlFlow::Continue(())
            },
        )?;
        reject_dependents(spec_id, dependents)
    }

    /// Validate removal of a contract specification.
    ///
    /// Sessions and scope specifications referencing it always block the
    /// delete. Child record specifications block it under
    /// [`ContractSpecDeletePolicy::Reject`]; under `Cascade` their addresses
    /// are returned so the caller removes them in the same mutation.
    pub fn validate_contract_spec_remove(
        &self,
        existing: Option<&ContractSpecification>,
        spec_id: &MetadataAddress,
        signers: &[AccountAddress],
        policy: ContractSpecDeletePolicy,
    ) -> Result<Vec<MetadataAddress>> {
        let existing = existing.ok_or(MetaError::SpecificationNotFound(*spec_id))?;
        require_same_identity(&existing.specification_id, spec_id)?;
        auth::require_signers_cover(&existing.owner_addresses, signers)?;

        let mut dependents = 0;
        self.store.iterate(
            &MetadataAddress::kind_prefix(AddressKind::Session),
            |session: Session| {
                if session.specification_id == *spec_id {
                    dependents += 1;
                }
                ControlFlow::Continue(())
            },
        )?;
        self.store.iterate(
            &MetadataAddress::kind_prefix(AddressKind::ScopeSpecification),
            |scope_spec: ScopeSpecification| {
                if scope_spec.contract_spec_ids.contains(spec_id) {
                    dependents += 1;
                }
                ControlFlow::Continue(())
            },
        )?;
        reject_dependents(spec_id, dependents)?;

        let children = self.specs.record_specs_for_contract_spec(spec_id)?;
        match policy {
            ContractSpecDeletePolicy::Reject => {
                reject_dependents(spec_id, children.len())?;
                Ok(Vec::new())
            }
            ContractSpecDeletePolicy::Cascade => Ok(children
                .into_iter()
                .map(|child| child.specification_id)
                .collect()),
        }
    }

    /// Validate removal of a record specification; the parent contract
    /// specification's owners must sign.
    pub fn validate_record_spec_remove(
        &self,
        existing: Option<&RecordSpecification>,
        spec_id: &MetadataAddress,
        signers: &[AccountAddress],
    ) -> Result<()> {
        let existing = existing.ok_or(MetaError::SpecificationNotFound(*spec_id))?;
        require_same_identity(&existing.specification_id, spec_id)?;
        let parent = self.require_parent_contract_spec(spec_id)?;
        auth::require_signers_cover(&parent.owner_addresses, signers)
    }

    fn require_parent_contract_spec(
        &self,
        record_spec_id: &MetadataAddress,
    ) -> Result<ContractSpecification> {
        let parent = record_spec_parent(record_spec_id)?;
        self.specs
            .resolve_contract_spec(&parent)?
            .ok_or(MetaError::ParentSpecificationNotFound {
                parent,
                child: *record_spec_id,
            })
    }
}

fn reject_dependents(address: &MetadataAddress, dependents: usize) -> Result<()> {
    if dependents > 0 {
        return Err(MetaError::ReferentialIntegrityViolation {
            address: *address,
            dependents,
        });
    }
    Ok(())
}

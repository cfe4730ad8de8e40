use super::{MetadataEvent, MsgHandler};
use crate::address::MetadataAddress;
use crate::core::{
    AccountAddress, ContractSpecification, RecordSpecification, Result, ScopeSpecification,
};
use tracing::{Level, event};

impl MsgHandler<'_> {
    pub(super) fn write_scope_spec(
        &mut self,
        specification: ScopeSpecification,
        signers: &[AccountAddress],
    ) -> Result<Vec<MetadataEvent>> {
        let existing: Option<ScopeSpecification> =
            self.store.get(&specification.specification_id)?;
        self.validator()
            .validate_scope_spec_update(existing.as_ref(), &specification, signers)?;

        let mut events = Vec::new();
        self.write(&specification, &mut events)?;
        Ok(events)
    }

    pub(super) fn delete_scope_spec(
        &mut self,
        specification_id: MetadataAddress,
        signers: &[AccountAddress],
    ) -> Result<Vec<MetadataEvent>> {
        let existing: Option<ScopeSpecification> = self.store.get(&specification_id)?;
        self.validator()
            .validate_scope_spec_remove(existing.as_ref(), &specification_id, signers)?;

        let mut events = Vec::new();
        self.remove(specification_id, &mut events);
        Ok(events)
    }

    pub(super) fn write_contract_spec(
        &mut self,
        specification: ContractSpecification,
        signers: &[AccountAddress],
    ) -> Result<Vec<MetadataEvent>> {
        let existing: Option<ContractSpecification> =
            self.store.get(&specification.specification_id)?;
        self.validator()
            .validate_contract_spec_update(existing.as_ref(), &specification, signers)?;

        let mut events = Vec::new();
        self.write(&specification, &mut events)?;
        Ok(events)
    }

    /// Remove a contract specification. Under the cascade policy its record
    /// specifications go first.
    pub(super) fn delete_contract_spec(
        &mut self,
        specification_id: MetadataAddress,
        signers: &[AccountAddress],
    ) -> Result<Vec<MetadataEvent>> {
        let existing: Option<ContractSpecification> = self.store.get(&specification_id)?;
        let children = self.validator().validate_contract_spec_remove(
            existing.as_ref(),
            &specification_id,
            signers,
            self.config.contract_spec_delete,
        )?;

        let mut events = Vec::with_capacity(children.len() + 1);
        for child in children {
            self.remove(child, &mut events);
        }
        if !events.is_empty() {
            event!(
                Level::DEBUG,
                record_specs = events.len(),
                "record specifications cascaded"
            );
        }
        self.remove(specification_id, &mut events);
        Ok(events)
    }

    pub(super) fn write_record_spec(
        &mut self,
        specification: RecordSpecification,
        signers: &[AccountAddress],
    ) -> Result<Vec<MetadataEvent>> {
        let existing: Option<RecordSpecification> =
            self.store.get(&specification.specification_id)?;
        self.validator()
            .validate_record_spec_update(existing.as_ref(), &specification, signers)?;

        let mut events = Vec::new();
        self.write(&specification, &mut events)?;
        Ok(events)
    }

    pub(super) fn delete_record_spec(
        &mut self,
        specification_id: MetadataAddress,
        signers: &[AccountAddress],
    ) -> Result<Vec<MetadataEvent>> {
        let existing: Option<RecordSpecification> = self.store.get(&specification_id)?;
        self.validator()
            .validate_record_spec_remove(existing.as_ref(), &specification_id, signers)?;

        let mut events = Vec::new();
        self.remove(specification_id, &mut events);
        Ok(events)
    }
}

use super::{MutationValidator, require_same_identity};
use crate::address::MetadataAddress;
use crate::auth;
use crate::core::{AccountAddress, MetaError, Record, RecordSpecification, Result, Session};

impl MutationValidator<'_> {
    /// Validate a record create or update.
    ///
    /// A record inherits its authorization context from its session: the
    /// session's contract specification decides the required parties and the
    /// scope's owners must sign. `pending_session` is a session being written
    /// in the same request; it takes precedence over the stored one.
    pub fn validate_record_update(
        &self,
        existing: Option<&Record>,
        proposed: &Record,
        pending_session: Option<&Session>,
        signers: &[AccountAddress],
    ) -> Result<()> {
        auth::require_non_empty(signers)?;
        proposed.validate_basic()?;
        let record_id = proposed.record_id()?;
        if let Some(existing) = existing {
            require_same_identity(&existing.record_id()?, &record_id)?;
        }

        let scope = self.require_scope(&proposed.session_id.scope_address()?)?;
        let session = match pending_session {
            Some(session) if session.session_id == proposed.session_id => session.clone(),
            _ => self
                .store
                .get(&proposed.session_id)?
                .ok_or(MetaError::SessionNotFound(proposed.session_id))?,
        };
        let spec = self.require_contract_spec(&session.specification_id)?;

        auth::require_parties_satisfied(&session.parties, &spec.parties_involved)?;
        auth::require_all_owners_signed(&scope.owner_addresses(), signers)?;

        if let Some(record_spec) = self
            .specs
            .resolve_record_spec_by_name(&session.specification_id, &proposed.name)?
        {
            auth::require_parties_satisfied(&session.parties, &record_spec.responsible_parties)?;
            validate_record_inputs(proposed, &record_spec)?;
        }
        Ok(())
    }

    /// Validate removal of a record: it must exist and the scope owners must
    /// sign.
    pub fn validate_record_remove(
        &self,
        existing: Option<&Record>,
        record_id: &MetadataAddress,
        signers: &[AccountAddress],
    ) -> Result<()> {
        let existing = existing.ok_or(MetaError::RecordNotFound(*record_id))?;
        require_same_identity(&existing.record_id()?, record_id)?;
        let scope = self.require_scope(&record_id.scope_address()?)?;
        auth::require_signers_cover(&scope.owner_addresses(), signers)
    }
}

fn validate_record_inputs(record: &Record, spec: &RecordSpecification) -> Result<()> {
    for input_spec in &spec.inputs {
        let input = record
            .inputs
            .iter()
            .find(|input| input.name == input_spec.name)
            .ok_or_else(|| {
                MetaError::InvalidEntity(format!(
                    "record '{}' is missing input '{}' required by its specification",
                    record.name, input_spec.name
                ))
            })?;
        if input.type_name != input_spec.type_name {
            return Err(MetaError::InvalidEntity(format!(
                "record input '{}' has type '{}', specification requires '{}'",
                input.name, input.type_name, input_spec.type_name
            )));
        }
    }
    Ok(())
}

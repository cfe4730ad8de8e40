use super::{MutationValidator, require_same_identity, validate_audit_update};
use crate::address::{AddressKind, MetadataAddress};
use crate::auth;
use crate::core::{AccountAddress, ContractSpecification, MetaError, Record, Result, Session};
use std::ops::ControlFlow;

impl MutationValidator<'_> {
    /// Validate a session create or update against its scope and contract
    /// specification.
    pub fn validate_session_update(
        &self,
        existing: Option<&Session>,
        proposed: &Session,
        signers: &[AccountAddress],
    ) -> Result<()> {
        auth::require_non_empty(signers)?;
        if let Some(existing) = existing {
            require_same_identity(&existing.session_id, &proposed.session_id)?;
        }
        proposed.validate_basic()?;

        let scope = self.require_scope(&proposed.scope_address()?)?;
        let spec = self.require_contract_spec(&proposed.specification_id)?;

        if proposed.name != spec.class_name {
            return Err(MetaError::NameSpecMismatch {
                expected: spec.class_name,
                actual: proposed.name.clone(),
            });
        }
        auth::require_parties_satisfied(&proposed.parties, &spec.parties_involved)?;
        auth::require_all_owners_signed(&scope.owner_addresses(), signers)?;
        validate_audit_update(
            existing.and_then(|e| e.audit.as_ref()),
            proposed.audit.as_ref(),
        )
    }

    /// Validate an explicit session removal: scope owners must sign and no
    /// record may still reference the session.
    pub fn validate_session_remove(
        &self,
        existing: Option<&Session>,
        session_id: &MetadataAddress,
        signers: &[AccountAddress],
    ) -> Result<()> {
        let existing = existing.ok_or(MetaError::SessionNotFound(*session_id))?;
        require_same_identity(&existing.session_id, session_id)?;
        let scope = self.require_scope(&existing.scope_address()?)?;
        auth::require_signers_cover(&scope.owner_addresses(), signers)?;
        self.ensure_session_unreferenced(session_id)
    }

    /// Fail with `ReferentialIntegrityViolation` while any record in the
    /// owning scope still points at `session_id`.
    ///
    /// Scans the scope's records, so the cost is linear in that count.
    pub fn ensure_session_unreferenced(&self, session_id: &MetadataAddress) -> Result<()> {
        self.ensure_session_unreferenced_after(session_id, &[])
    }

    /// Same guard, ignoring records that the current mutation removes.
    pub fn ensure_session_unreferenced_after(
        &self,
        session_id: &MetadataAddress,
        removed: &[MetadataAddress],
    ) -> Result<()> {
        let dependents = self.count_session_records_except(session_id, removed)?;
        if dependents > 0 {
            return Err(MetaError::ReferentialIntegrityViolation {
                address: *session_id,
                dependents,
            });
        }
        Ok(())
    }

    pub fn count_session_records(&self, session_id: &MetadataAddress) -> Result<usize> {
        self.count_session_records_except(session_id, &[])
    }

    fn count_session_records_except(
        &self,
        session_id: &MetadataAddress,
        removed: &[MetadataAddress],
    ) -> Result<usize> {
        if !session_id.is_kind(AddressKind::Session) {
            return Err(MetaError::InvalidInputKind(format!(
                "expected a session address, got {}",
                session_id.kind()
            )));
        }
        let prefix = session_id.scope_address()?.scope_record_prefix()?;
        let mut count = 0;
        self.store.iterate(&prefix, |record: Record| {
            if record.session_id == *session_id
                && !record.record_id().is_ok_and(|id| removed.contains(&id))
            {
                count += 1;
            }
            ControlFlow::Continue(())
        })?;
        Ok(count)
    }

    pub(super) fn require_contract_spec(
        &self,
        spec_id: &MetadataAddress,
    ) -> Result<ContractSpecification> {
        self.specs
            .resolve_contract_spec(spec_id)?
            .ok_or(MetaError::SpecificationNotFound(*spec_id))
    }
}

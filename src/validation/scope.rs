use super::{MutationValidator, require_same_identity};
use crate::address::MetadataAddress;
use crate::auth;
use crate::core::{AccountAddress, MetaError, Result, Scope};

impl MutationValidator<'_> {
    /// Validate a scope create (`existing` is `None`) or update.
    ///
    /// A create must be signed by every proposed owner. An update must be
    /// signed by every existing owner, except that the existing manager alone
    /// may change `data_access`. Changing the value owner also needs the
    /// current value owner's signature.
    pub fn validate_scope_update(
        &self,
        existing: Option<&Scope>,
        proposed: &Scope,
        signers: &[AccountAddress],
    ) -> Result<()> {
        auth::require_non_empty(signers)?;
        if let Some(existing) = existing {
            require_same_identity(&existing.scope_id, &proposed.scope_id)?;
        }
        proposed.validate_basic()?;

        let Some(existing) = existing else {
            return auth::require_all_owners_signed(&proposed.owner_addresses(), signers);
        };

        let manager_signed = existing
            .manager
            .as_ref()
            .is_some_and(|manager| auth::has_signed(manager, signers));
        if !(manager_signed && changes_only_data_access(existing, proposed)) {
            auth::require_all_owners_signed(&existing.owner_addresses(), signers)?;
        }

        if let Some(value_owner) = &existing.value_owner
            && existing.value_owner != proposed.value_owner
        {
            auth::require_all_owners_signed(std::slice::from_ref(value_owner), signers)?;
        }
        Ok(())
    }

    /// Validate removal of a scope. Sessions and records under the scope are
    /// not considered here; removing them is the caller's job.
    pub fn validate_scope_remove(
        &self,
        existing: Option<&Scope>,
        scope_id: &MetadataAddress,
        signers: &[AccountAddress],
    ) -> Result<()> {
        let existing = existing.ok_or(MetaError::ScopeNotFound(*scope_id))?;
        require_same_identity(&existing.scope_id, scope_id)?;
        auth::require_signers_cover(&existing.owner_addresses(), signers)
    }
}

fn changes_only_data_access(existing: &Scope, proposed: &Scope) -> bool {
    existing.specification_id == proposed.specification_id
        && existing.owners == proposed.owners
        && existing.manager == proposed.manager
        && existing.value_owner == proposed.value_owner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Party, PartyType};
    use crate::storage::{EntityStore, MemoryKvStore};
    use uuid::Uuid;

    fn signers(names: &[&str]) -> Vec<AccountAddress> {
        names.iter().map(|n| AccountAddress::new(*n)).collect()
    }

    fn scope(owners: &[&str]) -> Scope {
        Scope::new(
            MetadataAddress::scope(Uuid::from_bytes([1; 16])),
            owners.iter().map(|o| Party::new(*o, PartyType::Owner)).collect(),
        )
    }

    #[test]
    fn test_create_requires_proposed_owners() {
        let store = EntityStore::new(Box::new(MemoryKvStore::new()));
        let validator = MutationValidator::new(&store);
        let proposed = scope(&["alice", "bob"]);

        assert!(validator.validate_scope_update(None, &proposed, &signers(&["alice", "bob"])).is_ok());
        assert_eq!(
            validator.validate_scope_update(None, &proposed, &signers(&["alice"])),
            Err(MetaError::MissingSignatures(signers(&["bob"])))
        );
        assert_eq!(
            validator.validate_scope_update(None, &proposed, &[]),
            Err(MetaError::EmptySigners)
        );
    }

    #[test]
    fn test_update_cannot_change_identity() {
        let store = EntityStore::new(Box::new(MemoryKvStore::new()));
        let validator = MutationValidator::new(&store);
        let existing = scope(&["alice"]);
        let mut proposed = existing.clone();
        proposed.scope_id = MetadataAddress::scope(Uuid::from_bytes([2; 16]));

        let err = validator
            .validate_scope_update(Some(&existing), &proposed, &signers(&["alice"]))
            .unwrap_err();
        assert!(matches!(err, MetaError::IdentityMismatch { .. }));
    }

    #[test]
    fn test_update_requires_existing_owners() {
        let store = EntityStore::new(Box::new(MemoryKvStore::new()));
        let validator = MutationValidator::new(&store);
        let existing = scope(&["alice"]);
        let proposed = scope(&["bob"]);

        assert_eq!(
            validator.validate_scope_update(Some(&existing), &proposed, &signers(&["bob"])),
            Err(MetaError::MissingSignatures(signers(&["alice"])))
        );
        assert!(validator
            .validate_scope_update(Some(&existing), &proposed, &signers(&["alice"]))
            .is_ok());
    }

    #[test]
    fn test_manager_may_change_data_access_only() {
        let store = EntityStore::new(Box::new(MemoryKvStore::new()));
        let validator = MutationValidator::new(&store);
        let mut existing = scope(&["alice"]);
        existing.manager = Some("mgr".into());

        let mut proposed = existing.clone();
        proposed.data_access.push("auditor".into());
        assert!(validator.validate_scope_update(Some(&existing), &proposed, &signers(&["mgr"])).is_ok());

        proposed.owners.push(Party::new("mgr", PartyType::Owner));
        assert_eq!(
            validator.validate_scope_update(Some(&existing), &proposed, &signers(&["mgr"])),
            Err(MetaError::MissingSignatures(signers(&["alice"])))
        );
    }

    #[test]
    fn test_value_owner_change_needs_value_owner() {
        let store = EntityStore::new(Box::new(MemoryKvStore::new()));
        let validator = MutationValidator::new(&store);
        let mut existing = scope(&["alice"]);
        existing.value_owner = Some("vo".into());
        let mut proposed = existing.clone();
        proposed.value_owner = Some("buyer".into());

        assert_eq!(
            validator.validate_scope_update(Some(&existing), &proposed, &signers(&["alice"])),
            Err(MetaError::MissingSignatures(signers(&["vo"])))
        );
        assert!(validator
            .validate_scope_update(Some(&existing), &proposed, &signers(&["alice", "vo"]))
            .is_ok());
    }

    #[test]
    fn test_remove_requires_owners_and_existence() {
        let store = EntityStore::new(Box::new(MemoryKvStore::new()));
        let validator = MutationValidator::new(&store);
        let existing = scope(&["alice", "bob"]);

        assert!(matches!(
            validator.validate_scope_remove(None, &existing.scope_id, &signers(&["alice"])),
            Err(MetaError::ScopeNotFound(_))
        ));
        assert_eq!(
            validator.validate_scope_remove(Some(&existing), &existing.scope_id, &signers(&["alice"])),
            Err(MetaError::MissingSignatures(signers(&["bob"])))
        );
        assert!(validator
            .validate_scope_remove(Some(&existing), &existing.scope_id, &signers(&["bob", "alice"]))
            .is_ok());
    }
}

// ============================================================================
// Mutation Validation
// ============================================================================
//
// Decides whether a proposed create, update or delete is legal given the
// stored state, the governing specification and the signer set. Validators
// only read; the caller performs every write after validation succeeds, so a
// rejected mutation never leaves a partial write behind.
//
// ============================================================================

mod audit;
mod record;
mod scope;
mod session;
mod specification;

pub use audit::validate_audit_update;

use crate::address::MetadataAddress;
use crate::core::{MetaError, Result, Scope};
use crate::spec::SpecResolver;
use crate::storage::EntityStore;

pub struct MutationValidator<'a> {
    store: &'a EntityStore,
    specs: SpecResolver<'a>,
}

impl<'a> MutationValidator<'a> {
    pub fn new(store: &'a EntityStore) -> Self {
        Self {
            store,
            specs: SpecResolver::new(store),
        }
    }

    fn require_scope(&self, scope_id: &MetadataAddress) -> Result<Scope> {
        self.store
            .get(scope_id)?
            .ok_or(MetaError::ScopeNotFound(*scope_id))
    }
}

fn require_same_identity(existing: &MetadataAddress, proposed: &MetadataAddress) -> Result<()> {
    if existing != proposed {
        return Err(MetaError::IdentityMismatch {
            expected: *existing,
            actual: *proposed,
        });
    }
    Ok(())
}

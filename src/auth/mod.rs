//! Signer and party checks.
//!
//! Signature verification happens upstream; these functions only decide
//! whether an already-verified signer set authorizes a mutation.

use crate::core::{AccountAddress, MetaError, Party, PartyType, Result};
use std::collections::HashSet;

/// Every owner must be among the signers. Extra signers are fine.
///
/// Missing owners are reported in owner order, without duplicates.
pub fn require_all_owners_signed(
    owners: &[AccountAddress],
    signers: &[AccountAddress],
) -> Result<()> {
    let signed: HashSet<&AccountAddress> = signers.iter().collect();
    let mut missing: Vec<AccountAddress> = Vec::new();
    for owner in owners {
        if !signed.contains(owner) && !missing.contains(owner) {
            missing.push(owner.clone());
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MetaError::MissingSignatures(missing))
    }
}

/// Each role required by a specification must be held by at least one of
/// the parties declared on the entity.
pub fn require_parties_satisfied(declared: &[Party], required: &[PartyType]) -> Result<()> {
    let roles: HashSet<PartyType> = declared.iter().map(|p| p.role).collect();
    match required.iter().find(|role| !roles.contains(role)) {
        Some(role) => Err(MetaError::UnsatisfiedParty(*role)),
        None => Ok(()),
    }
}

/// Signers must cover `required`. Used by owner-gated removals.
pub fn require_signers_cover(
    required: &[AccountAddress],
    signers: &[AccountAddress],
) -> Result<()> {
    require_non_empty(signers)?;
    require_all_owners_signed(required, signers)
}

/// Every mutating request carries at least one signer.
pub fn require_non_empty(signers: &[AccountAddress]) -> Result<()> {
    if signers.is_empty() {
        return Err(MetaError::EmptySigners);
    }
    Ok(())
}

/// True when `account` is among the signers.
pub fn has_signed(account: &AccountAddress, signers: &[AccountAddress]) -> bool {
    signers.iter().any(|s| s == account)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts(names: &[&str]) -> Vec<AccountAddress> {
        names.iter().map(|n| AccountAddress::new(*n)).collect()
    }

    #[test]
    fn test_owners_signed_allows_superset() {
        let owners = accounts(&["alice", "bob"]);
        assert!(require_all_owners_signed(&owners, &accounts(&["bob", "alice"])).is_ok());
        assert!(require_all_owners_signed(&owners, &accounts(&["carol", "bob", "alice"])).is_ok());
    }

    #[test]
    fn test_owners_signed_reports_missing() {
        let owners = accounts(&["alice", "bob", "bob"]);
        let err = require_all_owners_signed(&owners, &accounts(&["alice"])).unwrap_err();
        assert_eq!(err, MetaError::MissingSignatures(accounts(&["bob"])));
    }

    #[test]
    fn test_removing_any_owner_breaks_authorization() {
        let owners = accounts(&["alice", "bob", "carol"]);
        for skip in 0..owners.len() {
            let signers: Vec<AccountAddress> = owners
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skip)
                .map(|(_, a)| a.clone())
                .collect();
            let err = require_all_owners_signed(&owners, &signers).unwrap_err();
            assert_eq!(err, MetaError::MissingSignatures(vec![owners[skip].clone()]));
        }
    }

    #[test]
    fn test_parties_satisfied_by_role() {
        let declared = vec![
            Party::new("alice", PartyType::Owner),
            Party::new("bob", PartyType::Servicer),
        ];
        assert!(require_parties_satisfied(&declared, &[PartyType::Owner, PartyType::Servicer]).is_ok());
        assert_eq!(
            require_parties_satisfied(&declared, &[PartyType::Owner, PartyType::Investor]),
            Err(MetaError::UnsatisfiedParty(PartyType::Investor))
        );
    }

    #[test]
    fn test_signers_cover_rejects_empty_signers() {
        assert_eq!(require_signers_cover(&[], &[]), Err(MetaError::EmptySigners));
        assert!(require_signers_cover(&[], &accounts(&["x"])).is_ok());
    }
}

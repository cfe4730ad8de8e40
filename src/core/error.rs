use crate::address::MetadataAddress;
use crate::core::types::{AccountAddress, PartyType};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetaError {
    #[error("scope not found for scope id {0}")]
    ScopeNotFound(MetadataAddress),

    #[error("session not found for session id {0}")]
    SessionNotFound(MetadataAddress),

    #[error("record not found for record id {0}")]
    RecordNotFound(MetadataAddress),

    #[error("specification not found with id {0}")]
    SpecificationNotFound(MetadataAddress),

    #[error("parent contract specification {parent} not found for record specification {child}")]
    ParentSpecificationNotFound {
        parent: MetadataAddress,
        child: MetadataAddress,
    },

    #[error("cannot update identifier. expected {expected}, got {actual}")]
    IdentityMismatch {
        expected: MetadataAddress,
        actual: MetadataAddress,
    },

    #[error("attempt to modify {0} audit field, modification not allowed")]
    AuditFieldsImmutable(AuditField),

    #[error("proposed name does not match contract spec. expected {expected}, got {actual}")]
    NameSpecMismatch { expected: String, actual: String },

    #[error("missing signatures from [{}]", join_accounts(.0))]
    MissingSignatures(Vec<AccountAddress>),

    #[error("missing party type from required parties: {0}")]
    UnsatisfiedParty(PartyType),

    #[error("cannot remove {address}: still referenced by {dependents} dependent(s)")]
    ReferentialIntegrityViolation {
        address: MetadataAddress,
        dependents: usize,
    },

    #[error("Malformed address: {0}")]
    MalformedAddress(String),

    #[error("Invalid address input: {0}")]
    InvalidInputKind(String),

    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    #[error("at least one signer is required")]
    EmptySigners,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, MetaError>;

/// Failure kinds, independent of the payload each variant carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    IdentityMismatch,
    AuditFieldsImmutable,
    NameSpecMismatch,
    MissingSignatures,
    UnsatisfiedParty,
    ReferentialIntegrityViolation,
    MalformedAddress,
    InvalidInputKind,
    InvalidEntity,
    Storage,
}

impl MetaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetaError::ScopeNotFound(_)
            | MetaError::SessionNotFound(_)
            | MetaError::RecordNotFound(_)
            | MetaError::SpecificationNotFound(_)
            | MetaError::ParentSpecificationNotFound { .. } => ErrorKind::NotFound,
            MetaError::IdentityMismatch { .. } => ErrorKind::IdentityMismatch,
            MetaError::AuditFieldsImmutable(_) => ErrorKind::AuditFieldsImmutable,
            MetaError::NameSpecMismatch { .. } => ErrorKind::NameSpecMismatch,
            MetaError::MissingSignatures(_) | MetaError::EmptySigners => {
                ErrorKind::MissingSignatures
            }
            MetaError::UnsatisfiedParty(_) => ErrorKind::UnsatisfiedParty,
            MetaError::ReferentialIntegrityViolation { .. } => {
                ErrorKind::ReferentialIntegrityViolation
            }
            MetaError::MalformedAddress(_) => ErrorKind::MalformedAddress,
            MetaError::InvalidInputKind(_) => ErrorKind::InvalidInputKind,
            MetaError::InvalidEntity(_) => ErrorKind::InvalidEntity,
            MetaError::Serialization(_) | MetaError::Io(_) | MetaError::LockError(_) => {
                ErrorKind::Storage
            }
        }
    }
}

/// Protected audit fields, named in [`MetaError::AuditFieldsImmutable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditField {
    /// The whole block was added where none existed.
    Block,
    CreatedBy,
    CreatedDate,
    UpdatedBy,
    UpdatedDate,
    Version,
    Message,
}

impl fmt::Display for AuditField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuditField::Block => "all",
            AuditField::CreatedBy => "created-by",
            AuditField::CreatedDate => "created-date",
            AuditField::UpdatedBy => "updated-by",
            AuditField::UpdatedDate => "updated-date",
            AuditField::Version => "version",
            AuditField::Message => "message",
        };
        f.write_str(name)
    }
}

fn join_accounts(accounts: &[AccountAddress]) -> String {
    accounts
        .iter()
        .map(AccountAddress::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl<T> From<std::sync::PoisonError<T>> for MetaError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for MetaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for MetaError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for MetaError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for MetaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_signatures_message_lists_accounts() {
        let err = MetaError::MissingSignatures(vec![
            AccountAddress::new("bob"),
            AccountAddress::new("carol"),
        ]);
        assert_eq!(err.to_string(), "missing signatures from [bob, carol]");
        assert_eq!(err.kind(), ErrorKind::MissingSignatures);
    }

    #[test]
    fn test_audit_field_message() {
        let err = MetaError::AuditFieldsImmutable(AuditField::CreatedBy);
        assert_eq!(
            err.to_string(),
            "attempt to modify created-by audit field, modification not allowed"
        );
    }
}

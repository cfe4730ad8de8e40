pub mod error;
pub mod types;

pub use error::{AuditField, ErrorKind, MetaError, Result};
pub use types::{
    AccountAddress, AuditFields, ContractSource, ContractSpecification, DefinitionType,
    Description, InputSource, InputSpecification, Party, PartyType, Process, ProcessId, Record,
    RecordInput, RecordInputSource, RecordInputStatus, RecordOutput, RecordSpecification,
    ResultStatus, Scope, ScopeSpecification, Session,
};

// ============================================================================
// metaledger Library
// ============================================================================
//
// Provenance metadata keeper: scopes group the records produced by sessions,
// and every entity conforms to a scope, contract or record specification.
// Entities live in a byte-keyed store under deterministic, type-tagged
// addresses; every mutation is validated against the stored state, its
// specification and its signers before anything is written.
//
// ============================================================================

//! Creating a scope and reading it back:
//!
//! ```
//! use metaledger::{MetadataAddress, MetadataKeeper, MetadataMsg, Party, PartyType, Scope};
//! use uuid::Uuid;
//!
//! # fn main() -> metaledger::Result<()> {
//! let mut keeper = MetadataKeeper::in_memory();
//! let scope_id = MetadataAddress::scope(Uuid::new_v4());
//! let scope = Scope::new(scope_id, vec![Party::new("alice", PartyType::Owner)]);
//!
//! keeper.handle(MetadataMsg::WriteScope {
//!     scope,
//!     signers: vec!["alice".into()],
//! })?;
//! assert!(keeper.scope(&scope_id)?.is_some());
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod auth;
pub mod config;
pub mod core;
pub mod facade;
pub mod handler;
pub mod spec;
pub mod storage;
pub mod validation;

pub use address::{AddressKind, MetadataAddress, NameHash, Secondary};
pub use config::{ContractSpecDeletePolicy, KeeperConfig};
pub use crate::core::{
    AccountAddress, AuditField, AuditFields, ContractSource, ContractSpecification,
    DefinitionType, Description, ErrorKind, InputSource, InputSpecification, MetaError, Party,
    PartyType, Process, ProcessId, Record, RecordInput, RecordInputSource, RecordInputStatus,
    RecordOutput, RecordSpecification, Result, ResultStatus, Scope, ScopeSpecification, Session,
};
pub use facade::{GenesisState, MetadataKeeper, SharedKeeper};
pub use handler::{
    EventKind, EventSink, MetadataEvent, MetadataMsg, RecordingEventSink, TracingEventSink,
};
pub use storage::{DurabilityMode, KvStore, MemoryKvStore, WriteOp};

// ============================================================================
// Command Handlers
// ============================================================================
//
// Each message is handled in three steps: load what exists, validate the
// mutation against it, then stage its writes. Reads always see the committed
// state; the staged batch is committed once, after the handler succeeds, so a
// message is applied whole or not at all. Every entity written or removed
// yields one event.
//
// ============================================================================

mod entity;
pub mod events;
mod specification;

pub use events::{EventKind, EventSink, MetadataEvent, RecordingEventSink, TracingEventSink};

use crate::address::MetadataAddress;
use crate::config::KeeperConfig;
use crate::core::{
    AccountAddress, ContractSpecification, Record, RecordSpecification, Result, Scope,
    ScopeSpecification, Session,
};
use crate::storage::{Entity, EntityBatch, EntityStore};
use crate::validation::MutationValidator;
use serde::{Deserialize, Serialize};
use tracing::{Level, event, info_span};

/// Inbound mutation request. Every variant carries the accounts that signed
/// it; order is irrelevant but the list must not be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataMsg {
    WriteScope {
        scope: Scope,
        signers: Vec<AccountAddress>,
    },
    DeleteScope {
        scope_id: MetadataAddress,
        signers: Vec<AccountAddress>,
    },
    WriteSession {
        session: Session,
        signers: Vec<AccountAddress>,
    },
    DeleteSession {
        session_id: MetadataAddress,
        signers: Vec<AccountAddress>,
    },
    /// Write a record, optionally creating or updating its session in the
    /// same request.
    WriteRecord {
        record: Record,
        session: Option<Session>,
        signers: Vec<AccountAddress>,
    },
    DeleteRecord {
        record_id: MetadataAddress,
        signers: Vec<AccountAddress>,
    },
    WriteScopeSpecification {
        specification: ScopeSpecification,
        signers: Vec<AccountAddress>,
    },
    DeleteScopeSpecification {
        specification_id: MetadataAddress,
        signers: Vec<AccountAddress>,
    },
    WriteContractSpecification {
        specification: ContractSpecification,
        signers: Vec<AccountAddress>,
    },
    DeleteContractSpecification {
        specification_id: MetadataAddress,
        signers: Vec<AccountAddress>,
    },
    WriteRecordSpecification {
        specification: RecordSpecification,
        signers: Vec<AccountAddress>,
    },
    DeleteRecordSpecification {
        specification_id: MetadataAddress,
        signers: Vec<AccountAddress>,
    },
}

impl MetadataMsg {
    pub fn name(&self) -> &'static str {
        match self {
            MetadataMsg::WriteScope { .. } => "write_scope",
            MetadataMsg::DeleteScope { .. } => "delete_scope",
            MetadataMsg::WriteSession { .. } => "write_session",
            MetadataMsg::DeleteSession { .. } => "delete_session",
            MetadataMsg::WriteRecord { .. } => "write_record",
            MetadataMsg::DeleteRecord { .. } => "delete_record",
            MetadataMsg::WriteScopeSpecification { .. } => "write_scope_specification",
            MetadataMsg::DeleteScopeSpecification { .. } => "delete_scope_specification",
            MetadataMsg::WriteContractSpecification { .. } => "write_contract_specification",
            MetadataMsg::DeleteContractSpecification { .. } => "delete_contract_specification",
            MetadataMsg::WriteRecordSpecification { .. } => "write_record_specification",
            MetadataMsg::DeleteRecordSpecification { .. } => "delete_record_specification",
        }
    }

    /// Address of the entity the message is about. `None` only for a record
    /// whose name cannot be hashed into an address.
    pub fn target(&self) -> Option<MetadataAddress> {
        match self {
            MetadataMsg::WriteScope { scope, .. } => Some(scope.scope_id),
            MetadataMsg::WriteSession { session, .. } => Some(session.session_id),
            MetadataMsg::WriteRecord { record, .. } => record.record_id().ok(),
            MetadataMsg::WriteScopeSpecification { specification, .. } => {
                Some(specification.specification_id)
            }
            MetadataMsg::WriteContractSpecification { specification, .. } => {
                Some(specification.specification_id)
            }
            MetadataMsg::WriteRecordSpecification { specification, .. } => {
                Some(specification.specification_id)
            }
            MetadataMsg::DeleteScope { scope_id: id, .. }
            | MetadataMsg::DeleteSession { session_id: id, .. }
            | MetadataMsg::DeleteRecord { record_id: id, .. }
            | MetadataMsg::DeleteScopeSpecification {
                specification_id: id,
                ..
            }
            | MetadataMsg::DeleteContractSpecification {
                specification_id: id,
                ..
            }
            | MetadataMsg::DeleteRecordSpecification {
                specification_id: id,
                ..
            } => Some(*id),
        }
    }

    pub fn signers(&self) -> &[AccountAddress] {
        match self {
            MetadataMsg::WriteScope { signers, .. }
            | MetadataMsg::DeleteScope { signers, .. }
            | MetadataMsg::WriteSession { signers, .. }
            | MetadataMsg::DeleteSession { signers, .. }
            | MetadataMsg::WriteRecord { signers, .. }
            | MetadataMsg::DeleteRecord { signers, .. }
            | MetadataMsg::WriteScopeSpecification { signers, .. }
            | MetadataMsg::DeleteScopeSpecification { signers, .. }
            | MetadataMsg::WriteContractSpecification { signers, .. }
            | MetadataMsg::DeleteContractSpecification { signers, .. }
            | MetadataMsg::WriteRecordSpecification { signers, .. }
            | MetadataMsg::DeleteRecordSpecification { signers, .. } => signers,
        }
    }
}

/// Applies one message to the store.
pub struct MsgHandler<'a> {
    store: &'a mut EntityStore,
    config: &'a KeeperConfig,
    batch: EntityBatch,
}

impl<'a> MsgHandler<'a> {
    pub fn new(store: &'a mut EntityStore, config: &'a KeeperConfig) -> Self {
        Self {
            store,
            config,
            batch: EntityBatch::new(),
        }
    }

    /// Validate and apply `msg`, returning the events of every entity it
    /// wrote or removed. A rejected message writes nothing.
    pub fn handle(&mut self, msg: MetadataMsg) -> Result<Vec<MetadataEvent>> {
        let target = msg.target().map(|a| a.to_string()).unwrap_or_default();
        let span = info_span!(
            "metadata.msg",
            msg = msg.name(),
            target = %target,
            signers = msg.signers().len()
        );
        let _enter = span.enter();

        self.batch = EntityBatch::new();
        let result = self.dispatch(msg).and_then(|events| {
            let batch = std::mem::take(&mut self.batch);
            self.store.commit(batch)?;
            Ok(events)
        });

        match &result {
            Ok(events) => event!(Level::DEBUG, events = events.len(), "metadata msg applied"),
            Err(err) => event!(
                Level::WARN,
                error = %err,
                kind = ?err.kind(),
                "metadata msg rejected"
            ),
        }
        result
    }

    fn dispatch(&mut self, msg: MetadataMsg) -> Result<Vec<MetadataEvent>> {
        match msg {
            MetadataMsg::WriteScope { scope, signers } => self.write_scope(scope, &signers),
            MetadataMsg::DeleteScope { scope_id, signers } => self.delete_scope(scope_id, &signers),
            MetadataMsg::WriteSession { session, signers } => {
                self.write_session(session, &signers)
            }
            MetadataMsg::DeleteSession {
                session_id,
                signers,
            } => self.delete_session(session_id, &signers),
            MetadataMsg::WriteRecord {
                record,
                session,
                signers,
            } => self.write_record(record, session, &signers),
            MetadataMsg::DeleteRecord { record_id, signers } => {
                self.delete_record(record_id, &signers)
            }
            MetadataMsg::WriteScopeSpecification {
                specification,
                signers,
            } => self.write_scope_spec(specification, &signers),
            MetadataMsg::DeleteScopeSpecification {
                specification_id,
                signers,
            } => self.delete_scope_spec(specification_id, &signers),
            MetadataMsg::WriteContractSpecification {
                specification,
                signers,
            } => self.write_contract_spec(specification, &signers),
            MetadataMsg::DeleteContractSpecification {
                specification_id,
                signers,
            } => self.delete_contract_spec(specification_id, &signers),
            MetadataMsg::WriteRecordSpecification {
                specification,
                signers,
            } => self.write_record_spec(specification, &signers),
            MetadataMsg::DeleteRecordSpecification {
                specification_id,
                signers,
            } => self.delete_record_spec(specification_id, &signers),
        }
    }

    fn validator(&self) -> MutationValidator<'_> {
        MutationValidator::new(&*self.store)
    }

    fn write<E: Entity>(&mut self, entity: &E, events: &mut Vec<MetadataEvent>) -> Result<()> {
        let address = self.batch.put(entity)?;
        let replaced = self.store.exists(&address)?;
        events.push(MetadataEvent::written(address, replaced));
        Ok(())
    }

    fn remove(&mut self, address: MetadataAddress, events: &mut Vec<MetadataEvent>) {
        self.batch.remove(&address);
        events.push(MetadataEvent::removed(address));
    }
}

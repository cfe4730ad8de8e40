use crate::address::{AddressKind, MetadataAddress};
use crate::config::KeeperConfig;
use crate::core::{
    ContractSpecification, MetaError, Record, RecordSpecification, Result, Scope,
    ScopeSpecification, Session,
};
use crate::handler::{EventSink, MetadataEvent, MetadataMsg, MsgHandler, TracingEventSink};
use crate::spec::SpecResolver;
use crate::storage::{DurableKvStore, EntityStore, KvStore, MemoryKvStore};
use crate::validation::MutationValidator;
use tracing::{Level, event};

/// Entry point for the metadata module: applies messages and answers
/// queries over one store.
///
/// Mutations go through `&mut self`, so a single keeper is serialized by the
/// borrow checker. Use [`SharedKeeper`](super::SharedKeeper) to share one
/// between tasks.
pub struct MetadataKeeper {
    store: EntityStore,
    config: KeeperConfig,
    sink: Box<dyn EventSink>,
}

impl MetadataKeeper {
    /// Open a keeper as described by `config`: durable when a data directory
    /// is set, in memory otherwise.
    pub fn open(config: KeeperConfig) -> Result<Self> {
        let kv: Box<dyn KvStore> = match &config.data_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                Box::new(DurableKvStore::open(
                    dir,
                    config.durability,
                    config.checkpoint_threshold,
                )?)
            }
            None => Box::new(MemoryKvStore::new()),
        };
        event!(
            Level::INFO,
            durable = config.data_dir.is_some(),
            "metadata keeper opened"
        );
        Ok(Self::with_store(kv, config))
    }

    pub fn in_memory() -> Self {
        Self::with_store(Box::new(MemoryKvStore::new()), KeeperConfig::default())
    }

    /// Build a keeper over a caller-supplied store.
    pub fn with_store(kv: Box<dyn KvStore>, config: KeeperConfig) -> Self {
        Self {
            store: EntityStore::new(kv),
            config,
            sink: Box::new(TracingEventSink),
        }
    }

    /// Replace the event sink (the default logs events through `tracing`).
    pub fn with_event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &KeeperConfig {
        &self.config
    }

    /// Validate and apply one message, then publish its events.
    pub fn handle(&mut self, msg: MetadataMsg) -> Result<Vec<MetadataEvent>> {
        let events = MsgHandler::new(&mut self.store, &self.config).handle(msg)?;
        for event in &events {
            self.sink.emit(event);
        }
        Ok(events)
    }

    /// Read-only access to the validation rules, e.g. to pre-check a message.
    pub fn validator(&self) -> MutationValidator<'_> {
        MutationValidator::new(&self.store)
    }

    /// Persist everything applied so far (a no-op for in-memory keepers).
    pub fn checkpoint(&mut self) -> Result<()> {
        self.store.flush()
    }

    pub(super) fn store(&self) -> &EntityStore {
        &self.store
    }

    pub(super) fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn scope(&self, scope_id: &MetadataAddress) -> Result<Option<Scope>> {
        self.store.get(scope_id)
    }

    pub fn session(&self, session_id: &MetadataAddress) -> Result<Option<Session>> {
        self.store.get(session_id)
    }

    pub fn record(&self, record_id: &MetadataAddress) -> Result<Option<Record>> {
        self.store.get(record_id)
    }

    pub fn scope_specification(
        &self,
        spec_id: &MetadataAddress,
    ) -> Result<Option<ScopeSpecification>> {
        SpecResolver::new(&self.store).resolve_scope_spec(spec_id)
    }

    pub fn contract_specification(
        &self,
        spec_id: &MetadataAddress,
    ) -> Result<Option<ContractSpecification>> {
        SpecResolver::new(&self.store).resolve_contract_spec(spec_id)
    }

    pub fn record_specification(
        &self,
        spec_id: &MetadataAddress,
    ) -> Result<Option<RecordSpecification>> {
        SpecResolver::new(&self.store).resolve_record_spec(spec_id)
    }

    pub fn sessions_in_scope(&self, scope_id: &MetadataAddress) -> Result<Vec<Session>> {
        self.store.collect(&scope_id.scope_session_prefix()?)
    }

    pub fn records_in_scope(&self, scope_id: &MetadataAddress) -> Result<Vec<Record>> {
        self.store.collect(&scope_id.scope_record_prefix()?)
    }

    pub fn records_for_session(&self, session_id: &MetadataAddress) -> Result<Vec<Record>> {
        if !session_id.is_kind(AddressKind::Session) {
            return Err(MetaError::InvalidInputKind(format!(
                "expected a session address, got {}",
                session_id.kind()
            )));
        }
        let mut records = self.records_in_scope(&session_id.scope_address()?)?;
        records.retain(|record| record.session_id == *session_id);
        Ok(records)
    }

    pub fn record_specs_for_contract_spec(
        &self,
        contract_spec_id: &MetadataAddress,
    ) -> Result<Vec<RecordSpecification>> {
        SpecResolver::new(&self.store).record_specs_for_contract_spec(contract_spec_id)
    }
}

impl Default for MetadataKeeper {
    fn default() -> Self {
        Self::in_memory()
    }
}

use crate::address::{AddressKind, MetadataAddress};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{Level, event};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    ScopeCreated,
    ScopeUpdated,
    ScopeRemoved,
    SessionCreated,
    SessionUpdated,
    SessionRemoved,
    RecordCreated,
    RecordUpdated,
    RecordRemoved,
    ScopeSpecificationCreated,
    ScopeSpecificationUpdated,
    ScopeSpecificationRemoved,
    ContractSpecificationCreated,
    ContractSpecificationUpdated,
    ContractSpecificationRemoved,
    RecordSpecificationCreated,
    RecordSpecificationUpdated,
    RecordSpecificationRemoved,
}

impl EventKind {
    /// Event for a successful write; `replaced` tells an update from a create.
    pub fn written(kind: AddressKind, replaced: bool) -> Self {
        use EventKind::*;
        match (kind, replaced) {
            (AddressKind::Scope, false) => ScopeCreated,
            (AddressKind::Scope, true) => ScopeUpdated,
            (AddressKind::Session, false) => SessionCreated,
            (AddressKind::Session, true) => SessionUpdated,
            (AddressKind::Record, false) => RecordCreated,
            (AddressKind::Record, true) => RecordUpdated,
            (AddressKind::ScopeSpecification, false) => ScopeSpecificationCreated,
            (AddressKind::ScopeSpecification, true) => ScopeSpecificationUpdated,
            (AddressKind::ContractSpecification, false) => ContractSpecificationCreated,
            (AddressKind::ContractSpecification, true) => ContractSpecificationUpdated,
            (AddressKind::RecordSpecification, false) => RecordSpecificationCreated,
            (AddressKind::RecordSpecification, true) => RecordSpecificationUpdated,
        }
    }

    pub fn removed(kind: AddressKind) -> Self {
        match kind {
            AddressKind::Scope => EventKind::ScopeRemoved,
            AddressKind::Session => EventKind::SessionRemoved,
            AddressKind::Record => EventKind::RecordRemoved,
            AddressKind::ScopeSpecification => EventKind::ScopeSpecificationRemoved,
            AddressKind::ContractSpecification => EventKind::ContractSpecificationRemoved,
            AddressKind::RecordSpecification => EventKind::RecordSpecificationRemoved,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One entity written or removed by a successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEvent {
    pub kind: EventKind,
    pub address: MetadataAddress,
}

impl MetadataEvent {
    pub fn written(address: MetadataAddress, replaced: bool) -> Self {
        Self {
            kind: EventKind::written(address.kind(), replaced),
            address,
        }
    }

    pub fn removed(address: MetadataAddress) -> Self {
        Self {
            kind: EventKind::removed(address.kind()),
            address,
        }
    }
}

/// Receives the events of every applied mutation, in application order.
pub trait EventSink: Send + Sync {
    fn emit(&mut self, event: &MetadataEvent);
}

/// Logs each event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&mut self, metadata_event: &MetadataEvent) {
        event!(
            Level::INFO,
            kind = %metadata_event.kind,
            address = %metadata_event.address,
            "metadata event"
        );
    }
}

/// Collects events in memory. Clones share the same buffer, so a test can
/// hand one clone to the keeper and inspect another.
#[derive(Debug, Default, Clone)]
pub struct RecordingEventSink {
    events: Arc<Mutex<Vec<MetadataEvent>>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MetadataEvent> {
        self.buffer().clone()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<MetadataEvent> {
        std::mem::take(&mut *self.buffer())
    }

    // A poisoned buffer still holds every complete event.
    fn buffer(&self) -> MutexGuard<'_, Vec<MetadataEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&mut self, event: &MetadataEvent) {
        self.buffer().push(*event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_event_kind_per_address_kind() {
        let scope = MetadataAddress::scope(Uuid::from_bytes([1; 16]));
        assert_eq!(MetadataEvent::written(scope, false).kind, EventKind::ScopeCreated);
        assert_eq!(MetadataEvent::written(scope, true).kind, EventKind::ScopeUpdated);
        assert_eq!(MetadataEvent::removed(scope).kind, EventKind::ScopeRemoved);

        let spec = MetadataAddress::record_specification(Uuid::from_bytes([2; 16]), "x").unwrap();
        assert_eq!(
            MetadataEvent::removed(spec).kind,
            EventKind::RecordSpecificationRemoved
        );
    }

    #[test]
    fn test_recording_sink_shares_buffer() {
        let sink = RecordingEventSink::new();
        let mut handle = sink.clone();
        let address = MetadataAddress::scope(Uuid::from_bytes([1; 16]));
        handle.emit(&MetadataEvent::written(address, false));

        assert_eq!(sink.events().len(), 1);
        assert_eq!(sink.take().len(), 1);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_recording_sink_survives_poisoned_lock() {
        let sink = RecordingEventSink::new();
        let address = MetadataAddress::scope(Uuid::from_bytes([1; 16]));
        sink.clone().emit(&MetadataEvent::written(address, false));

        let poisoner = sink.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.events.lock().unwrap();
            panic!("poison the buffer");
        })
        .join();
        assert!(sink.events.is_poisoned());

        sink.clone().emit(&MetadataEvent::removed(address));
        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.take().len(), 2);
    }
}

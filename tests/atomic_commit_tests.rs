//! A message's writes reach the store together or not at all

mod common;

use common::*;
use metaledger::{
    KeeperConfig, KvStore, MemoryKvStore, MetaError, MetadataKeeper, MetadataMsg, Party,
    PartyType, RecordingEventSink, Result, WriteOp,
};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Memory store that refuses every batch while `failing` is set.
struct FlakyStore {
    inner: MemoryKvStore,
    failing: Arc<AtomicBool>,
}

impl KvStore for FlakyStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn apply(&mut self, batch: Vec<WriteOp>) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MetaError::Io("disk full".to_string()));
        }
        self.inner.apply(batch)
    }

    fn iterate(
        &self,
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> ControlFlow<()>,
    ) -> Result<()> {
        self.inner.iterate(prefix, visit)
    }
}

fn flaky_keeper() -> (MetadataKeeper, Arc<AtomicBool>, RecordingEventSink) {
    let failing = Arc::new(AtomicBool::new(false));
    let store = FlakyStore {
        inner: MemoryKvStore::new(),
        failing: Arc::clone(&failing),
    };
    let sink = RecordingEventSink::new();
    let mut keeper = MetadataKeeper::with_store(Box::new(store), KeeperConfig::default())
        .with_event_sink(sink.clone());
    seed(&mut keeper);
    (keeper, failing, sink)
}

#[test]
fn test_failed_scope_delete_leaves_everything() {
    let (mut keeper, failing, sink) = flaky_keeper();
    write_record(&mut keeper, "appraisal");
    sink.take();

    failing.store(true, Ordering::SeqCst);
    let err = keeper
        .handle(MetadataMsg::DeleteScope {
            scope_id: scope_id(),
            signers: accounts(&["alice"]),
        })
        .unwrap_err();
    assert_eq!(err, MetaError::Io("disk full".to_string()));

    assert!(keeper.record(&record_id("appraisal")).unwrap().is_some());
    assert!(keeper.session(&session_id()).unwrap().is_some());
    assert!(keeper.scope(&scope_id()).unwrap().is_some());
    assert!(sink.events().is_empty());

    failing.store(false, Ordering::SeqCst);
    let events = keeper
        .handle(MetadataMsg::DeleteScope {
            scope_id: scope_id(),
            signers: accounts(&["alice"]),
        })
        .unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(sink.events(), events);
    assert!(keeper.scope(&scope_id()).unwrap().is_none());
}

#[test]
fn test_failed_record_write_keeps_pending_session_out() {
    let (mut keeper, failing, sink) = flaky_keeper();
    let before = keeper.session(&session_id()).unwrap();
    sink.take();

    let mut widened = session();
    widened.parties.push(Party::new("bob", PartyType::Servicer));

    failing.store(true, Ordering::SeqCst);
    assert!(
        keeper
            .handle(MetadataMsg::WriteRecord {
                record: record("appraisal"),
                session: Some(widened),
                signers: accounts(&["alice"]),
            })
            .is_err()
    );

    assert_eq!(keeper.session(&session_id()).unwrap(), before);
    assert!(keeper.record(&record_id("appraisal")).unwrap().is_none());
    assert!(sink.events().is_empty());
}

use super::{MetadataEvent, MsgHandler};
use crate::address::MetadataAddress;
use crate::core::{AccountAddress, AuditFields, MetaError, Record, Result, Scope, Session};
use chrono::{DateTime, Utc};
use tracing::{Level, event};

impl MsgHandler<'_> {
    pub(super) fn write_scope(
        &mut self,
        scope: Scope,
        signers: &[AccountAddress],
    ) -> Result<Vec<MetadataEvent>> {
        let existing: Option<Scope> = self.store.get(&scope.scope_id)?;
        self.validator()
            .validate_scope_update(existing.as_ref(), &scope, signers)?;

        let mut events = Vec::new();
        self.write(&scope, &mut events)?;
        Ok(events)
    }

    /// Remove a scope together with every record and session under it.
    pub(super) fn delete_scope(
        &mut self,
        scope_id: MetadataAddress,
        signers: &[AccountAddress],
    ) -> Result<Vec<MetadataEvent>> {
        let existing: Option<Scope> = self.store.get(&scope_id)?;
        self.validator()
            .validate_scope_remove(existing.as_ref(), &scope_id, signers)?;

        let records = self
            .store
            .collect::<Record>(&scope_id.scope_record_prefix()?)?
            .iter()
            .map(Record::record_id)
            .collect::<Result<Vec<_>>>()?;
        let sessions: Vec<MetadataAddress> = self
            .store
            .collect::<Session>(&scope_id.scope_session_prefix()?)?
            .into_iter()
            .map(|session| session.session_id)
            .collect();

        let mut events = Vec::with_capacity(records.len() + sessions.len() + 1);
        for address in records.into_iter().chain(sessions) {
            self.remove(address, &mut events);
        }
        self.remove(scope_id, &mut events);
        event!(Level::DEBUG, removed = events.len(), "scope removed with dependents");
        Ok(events)
    }

    pub(super) fn write_session(
        &mut self,
        mut session: Session,
        signers: &[AccountAddress],
    ) -> Result<Vec<MetadataEvent>> {
        let existing: Option<Session> = self.store.get(&session.session_id)?;
        self.validator()
            .validate_session_update(existing.as_ref(), &session, signers)?;
        stamp_audit(existing.as_ref(), &mut session, signers, Utc::now())?;

        let mut events = Vec::new();
        self.write(&session, &mut events)?;
        Ok(events)
    }

    pub(super) fn delete_session(
        &mut self,
        session_id: MetadataAddress,
        signers: &[AccountAddress],
    ) -> Result<Vec<MetadataEvent>> {
        let existing: Option<Session> = self.store.get(&session_id)?;
        self.validator()
            .validate_session_remove(existing.as_ref(), &session_id, signers)?;

        let mut events = Vec::new();
        self.remove(session_id, &mut events);
        Ok(events)
    }

    pub(super) fn write_record(
        &mut self,
        record: Record,
        session: Option<Session>,
        signers: &[AccountAddress],
    ) -> Result<Vec<MetadataEvent>> {
        let pending = match session {
            Some(mut session) => {
                let existing: Option<Session> = self.store.get(&session.session_id)?;
                self.validator()
                    .validate_session_update(existing.as_ref(), &session, signers)?;
                stamp_audit(existing.as_ref(), &mut session, signers, Utc::now())?;
                Some(session)
            }
            None => None,
        };

        let record_id = record.record_id()?;
        let existing: Option<Record> = self.store.get(&record_id)?;
        self.validator()
            .validate_record_update(existing.as_ref(), &record, pending.as_ref(), signers)?;

        let mut events = Vec::new();
        if let Some(session) = &pending {
            self.write(session, &mut events)?;
        }
        self.write(&record, &mut events)?;
        Ok(events)
    }

    pub(super) fn delete_record(
        &mut self,
        record_id: MetadataAddress,
        signers: &[AccountAddress],
    ) -> Result<Vec<MetadataEvent>> {
        let existing: Option<Record> = self.store.get(&record_id)?;
        self.validator()
            .validate_record_remove(existing.as_ref(), &record_id, signers)?;

        let mut events = Vec::new();
        self.remove(record_id, &mut events);
        if self.config.prune_empty_sessions
            && let Some(record) = existing
        {
            self.prune_session(record.session_id, &record_id, &mut events)?;
        }
        Ok(events)
    }

    /// Implicit cleanup after a record delete: drop the session once nothing
    /// but the removed record references it. A session that is still
    /// referenced stays.
    fn prune_session(
        &mut self,
        session_id: MetadataAddress,
        removed_record: &MetadataAddress,
        events: &mut Vec<MetadataEvent>,
    ) -> Result<()> {
        let guard = self
            .validator()
            .ensure_session_unreferenced_after(&session_id, std::slice::from_ref(removed_record));
        match guard {
            Ok(()) => {
                if self.store.exists(&session_id)? {
                    self.remove(session_id, events);
                    event!(Level::DEBUG, session = %session_id, "empty session pruned");
                }
                Ok(())
            }
            Err(MetaError::ReferentialIntegrityViolation { dependents, .. }) => {
                event!(
                    Level::DEBUG,
                    session = %session_id,
                    dependents,
                    "session still referenced, kept"
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

/// Fill in the audit block of a validated session write. The first signer is
/// recorded as the author.
fn stamp_audit(
    existing: Option<&Session>,
    session: &mut Session,
    signers: &[AccountAddress],
    now: DateTime<Utc>,
) -> Result<()> {
    let signer = signers.first().ok_or(MetaError::EmptySigners)?;
    let audit = match existing.and_then(|e| e.audit.clone()) {
        Some(mut audit) => {
            audit.updated_by = Some(signer.clone());
            audit.updated_date = Some(now);
            audit.version += 1;
            audit
        }
        None => AuditFields::created(signer.clone(), now),
    };
    session.audit = Some(audit);
    Ok(())
}

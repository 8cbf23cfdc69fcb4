//! Port for session persistence.
//!
//! The engine treats storage as an append-only sink of [`SessionEvent`]s plus
//! a slot for the final report. A session is reloaded by replaying its
//! events through [`DiscussionSession::replay`](mdt_domain::DiscussionSession::replay).
//!
//! Like the tracing subscriber, the store is called synchronously from the
//! scheduler; implementations should keep writes short.

use mdt_domain::{ConsensusReport, DomainError, SessionEvent, SessionId};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Session {0} not found")]
    NotFound(SessionId),

    #[error("Stored session is invalid: {0}")]
    Corrupt(#[from] DomainError),

    #[error("Session {0} is claimed by another writer ({1})")]
    Claimed(SessionId, String),
}

pub trait SessionStore: Send + Sync {
    /// Append one event to the session's log.
    fn append_event(&self, session_id: &SessionId, event: &SessionEvent) -> Result<(), StoreError>;

    /// All events of a session, oldest first.
    fn load_events(&self, session_id: &SessionId) -> Result<Vec<SessionEvent>, StoreError>;

    fn save_report(&self, session_id: &SessionId, report: &ConsensusReport)
    -> Result<(), StoreError>;

    /// Claim exclusive write access to a session's log.
    ///
    /// Stores shared between processes must refuse a second claim with
    /// [`StoreError::Claimed`] until [`release`](SessionStore::release).
    fn claim(&self, _session_id: &SessionId) -> Result<(), StoreError> {
        Ok(())
    }

    fn release(&self, _session_id: &SessionId) {}
}

/// Discards everything; loading always fails with `NotFound`.
pub struct NoSessionStore;

impl SessionStore for NoSessionStore {
    fn append_event(&self, _session_id: &SessionId, _event: &SessionEvent) -> Result<(), StoreError> {
        Ok(())
    }

    fn load_events(&self, session_id: &SessionId) -> Result<Vec<SessionEvent>, StoreError> {
        Err(StoreError::NotFound(session_id.clone()))
    }

    fn save_report(
        &self,
        _session_id: &SessionId,
        _report: &ConsensusReport,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Keeps event logs in memory, for tests and single-process use.
#[derive(Default)]
pub struct InMemorySessionStore {
    events: Mutex<HashMap<SessionId, Vec<SessionEvent>>>,
    reports: Mutex<HashMap<SessionId, ConsensusReport>>,
    claimed: Mutex<HashSet<SessionId>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, session_id: &SessionId) -> Option<ConsensusReport> {
        let reports = self.reports.lock().unwrap_or_else(|e| e.into_inner());
        reports.get(session_id).cloned()
    }

    pub fn event_count(&self, session_id: &SessionId) -> usize {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.get(session_id).map(Vec::len).unwrap_or(0)
    }
}

impl SessionStore for InMemorySessionStore {
    fn append_event(&self, session_id: &SessionId, event: &SessionEvent) -> Result<(), StoreError> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events
            .entry(session_id.clone())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    fn load_events(&self, session_id: &SessionId) -> Result<Vec<SessionEvent>, StoreError> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events
            .get(session_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(session_id.clone()))
    }

    fn save_report(&self, session_id: &SessionId, report: &ConsensusReport) -> Result<(), StoreError> {
        let mut reports = self.reports.lock().unwrap_or_else(|e| e.into_inner());
        reports.insert(session_id.clone(), report.clone());
        Ok(())
    }

    fn claim(&self, session_id: &SessionId) -> Result<(), StoreError> {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        if !claimed.insert(session_id.clone()) {
            return Err(StoreError::Claimed(
                session_id.clone(),
                "in-memory claim".to_string(),
            ));
        }
        Ok(())
    }

    fn release(&self, session_id: &SessionId) {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        claimed.remove(session_id);
    }
}

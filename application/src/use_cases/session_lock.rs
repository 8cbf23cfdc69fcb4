//! Per-session mutual exclusion.
//!
//! At most one scheduler may advance a given session id at a time. The
//! guard releases the id when dropped, including on early return or panic.
//!
//! Schedulers share [`SessionLocks::global`] unless given their own
//! registry. Exclusion across processes is the session store's job.

use mdt_domain::SessionId;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock, Mutex};

static GLOBAL: LazyLock<SessionLocks> = LazyLock::new(SessionLocks::new);

/// Shared registry of session ids currently being advanced.
#[derive(Debug, Clone, Default)]
pub struct SessionLocks {
    held: Arc<Mutex<HashSet<SessionId>>>,
}

impl SessionLocks {
    /// A fresh registry, independent of every other.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    /// Claim `id`, or `None` if another holder has it.
    pub fn try_acquire(&self, id: &SessionId) -> Option<SessionGuard> {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        if !held.insert(id.clone()) {
            return None;
        }
        Some(SessionGuard {
            locks: self.clone(),
            id: id.clone(),
        })
    }

    pub fn is_held(&self, id: &SessionId) -> bool {
        let held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        held.contains(id)
    }
}

/// Exclusive claim on one session id.
#[derive(Debug)]
pub struct SessionGuard {
    locks: SessionLocks,
    id: SessionId,
}

impl SessionGuard {
    pub fn session_id(&self) -> &SessionId {
        &self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut held = self.locks.held.lock().unwrap_or_else(|e| e.into_inner());
        held.remove(&self.id);
    }
}

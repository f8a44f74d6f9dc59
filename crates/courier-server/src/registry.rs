//! The registry of admitted sessions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::session::{Session, SessionId};

/// Concurrent map of admitted sessions, and the source of session ids.
///
/// Enumeration order is unspecified.
#[derive(Debug)]
pub struct ClientRegistry {
    sessions: DashMap<SessionId, Arc<Session>>,
    next_id: AtomicU64,
}

impl ClientRegistry {
    /// Creates an empty registry whose first id is 1.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocates a fresh session id.
    pub fn next_id(&self) -> SessionId {
        SessionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Adds a session, replacing any entry with the same id.
    pub fn add(&self, session: Arc<Session>) {
        self.sessions.insert(session.id(), session);
    }

    /// Removes a session. Removing an absent id is a no-op.
    pub fn remove(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.remove(&id).map(|(_, session)| session)
    }

    /// Looks up a session.
    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Every admitted session except the excluded ids.
    pub fn list(&self, exclude: &[SessionId]) -> Vec<Arc<Session>> {
        self.sessions
            .iter()
            .filter(|entry| !exclude.contains(entry.key()))
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Number of admitted sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is admitted.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

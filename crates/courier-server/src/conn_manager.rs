//! Per-channel index of authenticated users.
//!
//! Tracks which sessions belong to which user so presence can be announced
//! per user: the first session of a user joins, the last one leaves.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::session::{Session, SessionId};

/// Result of removing a session from a [`ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// The session was not tracked.
    NotTracked,
    /// The user still has other sessions.
    StillConnected,
    /// That was the user's last session; the user entry is gone.
    LastConnection,
}

#[derive(Default)]
struct Index {
    clients: HashMap<SessionId, (String, Arc<Session>)>,
    users: HashMap<String, HashMap<SessionId, Arc<Session>>>,
}

/// Authenticated user index for one channel.
///
/// A user entry exists exactly as long as at least one of its sessions does.
#[derive(Default)]
pub struct ConnectionManager {
    index: RwLock<Index>,
}

impl ConnectionManager {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks an authenticated session under its identity.
    ///
    /// Returns `true` when this is the user's first session.
    pub fn set_auth(&self, session: &Arc<Session>) -> bool {
        let user = session.identity();
        let mut index = self.index.write();
        index
            .clients
            .insert(session.id(), (user.clone(), Arc::clone(session)));
        let sessions = index.users.entry(user).or_default();
        sessions.insert(session.id(), Arc::clone(session));
        sessions.len() == 1
    }

    /// Stops tracking a session.
    pub fn remove_auth(&self, id: SessionId) -> Departure {
        let mut index = self.index.write();
        let Some((user, _)) = index.clients.remove(&id) else {
            return Departure::NotTracked;
        };
        let Some(sessions) = index.users.get_mut(&user) else {
            return Departure::LastConnection;
        };
        sessions.remove(&id);
        if sessions.is_empty() {
            index.users.remove(&user);
            Departure::LastConnection
        } else {
            Departure::StillConnected
        }
    }

    /// Every tracked session whose user is not excluded.
    pub fn authorized_user_clients(&self, except_users: &[&str]) -> Vec<Arc<Session>> {
        self.index
            .read()
            .users
            .iter()
            .filter(|(user, _)| !except_users.contains(&user.as_str()))
            .flat_map(|(_, sessions)| sessions.values().cloned())
            .collect()
    }

    /// Every tracked session except the excluded ids.
    pub fn authorized_clients(&self, except: &[SessionId]) -> Vec<Arc<Session>> {
        self.index
            .read()
            .clients
            .iter()
            .filter(|(id, _)| !except.contains(id))
            .map(|(_, (_, session))| Arc::clone(session))
            .collect()
    }

    /// Ids of connected users, minus the excluded ones.
    pub fn authorized_user_ids(&self, except: &[&str]) -> Vec<String> {
        self.index
            .read()
            .users
            .keys()
            .filter(|user| !except.contains(&user.as_str()))
            .cloned()
            .collect()
    }

    /// Every session of one user.
    pub fn user_sessions(&self, user_id: &str) -> Vec<Arc<Session>> {
        self.index
            .read()
            .users
            .get(user_id)
            .map(|sessions| sessions.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether the user has at least one session.
    pub fn is_user_connected(&self, user_id: &str) -> bool {
        self.index.read().users.contains_key(user_id)
    }

    /// Number of tracked sessions.
    pub fn len(&self) -> usize {
        self.index.read().clients.len()
    }

    /// Number of distinct users.
    pub fn user_count(&self) -> usize {
        self.index.read().users.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.index.read().clients.is_empty()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let index = self.index.read();
        f.debug_struct("ConnectionManager")
            .field("sessions", &index.clients.len())
            .field("users", &index.users.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session;
    use courier_core::Authentication;

    fn authed(id: u64, user: &str) -> Arc<Session> {
        let session = session(id);
        session.set_auth(Authentication::new(user)).unwrap();
        session
    }

    #[test]
    fn test_first_and_last_connection() {
        let manager = ConnectionManager::new();
        let phone = authed(1, "ann");
        let laptop = authed(2, "ann");

        assert!(manager.set_auth(&phone));
        assert!(!manager.set_auth(&laptop));
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.user_count(), 1);

        assert_eq!(manager.remove_auth(phone.id()), Departure::StillConnected);
        assert!(manager.is_user_connected("ann"));

        assert_eq!(manager.remove_auth(laptop.id()), Departure::LastConnection);
        assert!(!manager.is_user_connected("ann"));
        assert!(manager.is_empty());

        assert_eq!(manager.remove_auth(laptop.id()), Departure::NotTracked);
    }

    #[test]
    fn test_queries_exclude() {
        let manager = ConnectionManager::new();
        let ann = authed(1, "ann");
        let ann2 = authed(2, "ann");
        let bob = authed(3, "bob");
        for s in [&ann, &ann2, &bob] {
            manager.set_auth(s);
        }

        let others = manager.authorized_user_clients(&["ann"]);
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].id(), bob.id());

        assert_eq!(manager.authorized_clients(&[ann.id()]).len(), 2);
        assert_eq!(manager.authorized_user_ids(&["bob"]), vec!["ann".to_string()]);
        assert_eq!(manager.user_sessions("ann").len(), 2);
        assert!(manager.user_sessions("cid").is_empty());
    }
}

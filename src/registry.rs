//! Session Registry
//!
//! Live sessions in registration order, capped at a maximum count.

use std::collections::BTreeMap;

use crate::session::{Session, SessionId};

pub struct SessionRegistry {
    sessions: BTreeMap<SessionId, Session>,
    next_id: SessionId,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: BTreeMap::new(),
            next_id: 1,
            max_sessions,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.sessions.len() >= self.max_sessions
    }

    /// Reserve the next id without registering anything
    pub fn next_id(&self) -> SessionId {
        self.next_id
    }

    /// Add a session built for the id from [`Self::next_id`].
    /// Hands the session back when the registry is full.
    pub fn insert(&mut self, session: Session) -> Result<SessionId, Session> {
        if self.is_full() {
            return Err(session);
        }
        let id = session.id;
        self.next_id = self.next_id.max(id + 1);
        self.sessions.insert(id, session);
        Ok(id)
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    /// Ids of every live session, oldest first
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::{mpsc, oneshot};

    fn session(id: SessionId) -> Session {
        let (tx, _rx) = mpsc::channel(1);
        let (shutdown, _) = oneshot::channel();
        Session::new(id, format!("peer-{}", id), tx, shutdown, Duration::from_millis(100))
    }

    #[test]
    fn test_capacity() {
        let mut registry = SessionRegistry::new(2);
        assert!(registry.insert(session(registry.next_id())).is_ok());
        assert!(registry.insert(session(registry.next_id())).is_ok());
        assert!(registry.is_full());

        let rejected = registry.insert(session(registry.next_id()));
        assert!(matches!(rejected, Err(s) if s.id == 3));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registration_order_and_removal() {
        let mut registry = SessionRegistry::new(10);
        for _ in 0..3 {
            assert!(registry.insert(session(registry.next_id())).is_ok());
        }
        assert_eq!(registry.ids(), vec![1, 2, 3]);

        assert!(registry.remove(2).is_some());
        assert!(registry.remove(2).is_none());
        assert_eq!(registry.ids(), vec![1, 3]);

        // Ids are never reused
        assert!(registry.insert(session(registry.next_id())).is_ok());
        assert_eq!(registry.ids(), vec![1, 3, 4]);
        assert!(!registry.is_empty());
    }
}

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::models::{PatientRecord, Role, Speaker};

/// One line of a session transcript. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub speaker: Speaker,
    pub text: String,
    /// Role active after the turn this entry belongs to.
    pub role: Role,
    pub at: DateTime<Utc>,
}

/// Conversational state for one session id.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub role: Role,
    /// Bound patient. Records are immutable, so a snapshot is the identity.
    pub patient: Option<PatientRecord>,
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Identifying,
            patient: None,
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.history.push(HistoryEntry {
            speaker,
            text: text.into(),
            role: self.role,
            at: Utc::now(),
        });
    }
}

/// Session id → session, one async mutex per session.
///
/// The outer map lock is held only to find or insert a handle; turns lock the
/// per-session mutex, so different sessions never wait on each other.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for `id`, creating the session on first use.
    pub fn get_or_create(&self, id: &str) -> Arc<Mutex<Session>> {
        if let Some(handle) = self.get(id) {
            return handle;
        }
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id = id, "Session created");
                Arc::new(Mutex::new(Session::new(id)))
            })
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Drop a session. A turn already holding its handle finishes normally.
    pub fn remove(&self, id: &str) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_identifying_and_unbound() {
        let session = Session::new("s1");
        assert_eq!(session.role, Role::Identifying);
        assert!(session.patient.is_none());
        assert!(session.history.is_empty());
    }

    #[test]
    fn push_stamps_current_role() {
        let mut session = Session::new("s1");
        session.push(Speaker::Patient, "hello");
        session.role = Role::Informational;
        session.push(Speaker::Router, "handoff");
        assert_eq!(session.history[0].role, Role::Identifying);
        assert_eq!(session.history[1].role, Role::Informational);
    }

    #[tokio::test]
    async fn same_id_shares_one_session() {
        let store = SessionStore::new();
        let a = store.get_or_create("abc");
        let b = store.get_or_create("abc");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);

        a.lock().await.push(Speaker::Patient, "hi");
        assert_eq!(b.lock().await.history.len(), 1);
    }

    #[test]
    fn remove_evicts() {
        let store = SessionStore::new();
        store.get_or_create("abc");
        assert!(store.remove("abc"));
        assert!(!store.remove("abc"));
        assert!(store.get("abc").is_none());
        assert!(store.is_empty());
    }
}

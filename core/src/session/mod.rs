//! Session state: namespaces keyed by session id, plus their locks
//!
//! The [`NamespaceStore`] is an explicit process-wide registry handed to the
//! engine. Entries are added on the first persistent execution that names a
//! new id and removed only by an explicit clear; nothing is evicted and
//! nothing survives a restart.

pub mod locks;
pub mod namespace;


use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::types::SessionInfo;

pub use locks::SessionLockTable;
pub use namespace::Namespace;

/// A namespace shared between the store and the execution using it
pub type SharedNamespace = Arc<Mutex<Namespace>>;

#[derive(Debug)]
struct SessionEntry {
    namespace: SharedNamespace,
    created_at: DateTime<Utc>,
    last_touched: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct NamespaceStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl NamespaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh namespace that is never stored
    pub fn ephemeral() -> SharedNamespace {
        Arc::new(Mutex::new(Namespace::new()))
    }

    /// Resolve the namespace for `session_id`.
    ///
    /// Non-persistent requests always get a fresh, unstored namespace, even
    /// when `session_id` names a live session. Persistent requests get the
    /// stored namespace itself (not a copy), creating it if the id is new.
    pub fn get_or_create(&self, session_id: &str, persistent: bool) -> SharedNamespace {
        if !persistent {
            return Self::ephemeral();
        }

        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let entry = sessions.entry(session_id.to_string()).or_insert_with(|| {
            info!(session_id, "Created session");
            SessionEntry {
                namespace: Self::ephemeral(),
                created_at: now,
                last_touched: now,
            }
        });
        entry.last_touched = now;
        Arc::clone(&entry.namespace)
    }

    /// Remove the session; returns how many bindings it held, if it existed
    pub fn clear(&self, session_id: &str) -> Option<usize> {
        let entry = self.sessions.write().remove(session_id)?;
        let bindings = entry.namespace.lock().len();
        info!(session_id, bindings, "Cleared session");
        Some(bindings)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    /// Live session ids, sorted
    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Summary of every live session, sorted by id.
    ///
    /// A session whose namespace is busy reports the binding count it had
    /// when the lock became free; this waits for the running execution.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let entries: Vec<(String, SharedNamespace, DateTime<Utc>, DateTime<Utc>)> = self
            .sessions
            .read()
            .iter()
            .map(|(id, entry)| {
                (
                    id.clone(),
                    Arc::clone(&entry.namespace),
                    entry.created_at,
                    entry.last_touched,
                )
            })
            .collect();

        let mut infos: Vec<SessionInfo> = entries
            .into_iter()
            .map(|(session_id, namespace, created_at, last_touched)| SessionInfo {
                session_id,
                bindings: namespace.lock().len(),
                created_at,
                last_touched,
            })
            .collect();
        infos.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        infos
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use lobby_system::{LobbyPolicy, SessionId};

use crate::session::{spawn_session, SessionTx};

/// Session id to session mailbox. Sessions are created on first use and
/// never removed.
pub struct SessionRegistry {
    policy: LobbyPolicy,
    mailbox_capacity: usize,
    sessions: Mutex<HashMap<SessionId, SessionTx>>,
}

impl SessionRegistry {
    pub fn new(policy: LobbyPolicy, mailbox_capacity: usize) -> Self {
        Self {
            policy,
            mailbox_capacity,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Lookup and insertion happen under one lock, so concurrent first joins
    /// to the same id spawn exactly one session.
    pub fn get_or_create(&self, session_id: &str) -> SessionTx {
        let policy = self.policy;
        let capacity = self.mailbox_capacity;
        self.lock()
            .entry(session_id.to_owned())
            .or_insert_with(|| {
                log::info!("Creating session {:?}", session_id);
                spawn_session(session_id.to_owned(), policy, capacity)
            })
            .clone()
    }

    pub fn get(&self, session_id: &str) -> Option<SessionTx> {
        self.lock().get(session_id).cloned()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, SessionTx>> {
        // the map stays consistent even if a holder panicked
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

//! In-memory per-conversation state.
//!
//! Each session sits behind its own async mutex; a turn holds that lock from
//! the user message to the final event, so turns on one id run one at a time
//! while different ids proceed independently. The map itself is only locked
//! for lookups and inserts.
//!
//! A handle that has been checked out with [`SessionStore::get`] counts as
//! busy until it is dropped: eviction never removes it, and
//! [`SessionStore::remove`] clears it in place instead of dropping it, so a
//! given id maps to exactly one mutex.

use cloudclaw_core::message::{Message, Session, SessionId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

pub const DEFAULT_MAX_SESSIONS: usize = 1000;

pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<SessionId, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Handle for `id`, creating an empty session on first use.
    pub fn get(&self, id: &SessionId) -> SessionHandle {
        let mut map = self.map();
        if let Some(handle) = map.get(id) {
            return handle.clone();
        }
        if map.len() >= self.max_sessions {
            Self::evict_idlest(&mut map);
        }
        debug!(session_id = %id, "Creating session");
        let handle = Arc::new(tokio::sync::Mutex::new(Session::new(id.clone())));
        map.insert(id.clone(), handle.clone());
        handle
    }

    /// Handle for `id` if the session exists.
    pub fn find(&self, id: &SessionId) -> Option<SessionHandle> {
        self.map().get(id).cloned()
    }

    /// Append a turn, creating the session if needed.
    pub async fn append(&self, id: &SessionId, message: Message) {
        let handle = self.get(id);
        handle.lock().await.push(message);
    }

    /// A copy of the history, waiting for any running turn to finish.
    pub async fn history(&self, id: &SessionId) -> Option<Vec<Message>> {
        let handle = self.find(id)?;
        let session = handle.lock().await;
        Some(session.history().to_vec())
    }

    /// Clear a session. Returns `false` if it did not exist.
    ///
    /// Waits for a running turn to finish first. The entry is only dropped
    /// from the map when nobody else holds its handle; otherwise the history
    /// is reset and the next turn continues on the same session.
    pub async fn remove(&self, id: &SessionId) -> bool {
        let Some(handle) = self.find(id) else {
            return false;
        };
        let mut session = handle.lock().await;
        *session = Session::new(id.clone());

        let mut map = self.map();
        let ours = map.get(id).is_some_and(|h| Arc::ptr_eq(h, &handle));
        // One reference in the map, one here.
        if ours && Arc::strong_count(&handle) == 2 {
            map.remove(id);
            debug!(session_id = %id, "Session removed");
        } else {
            debug!(session_id = %id, "Session in use; cleared in place");
        }
        true
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Remove the session with the oldest activity that nobody has checked out.
    fn evict_idlest(map: &mut HashMap<SessionId, SessionHandle>) {
        let victim = map
            .iter()
            .filter(|(_, handle)| Arc::strong_count(handle) == 1)
            .filter_map(|(id, handle)| {
                handle
                    .try_lock()
                    .ok()
                    .map(|session| (id.clone(), session.last_activity_at))
            })
            .min_by_key(|(_, last)| *last)
            .map(|(id, _)| id);

        match victim {
            Some(id) => {
                debug!(session_id = %id, "Evicting idle session");
                map.remove(&id);
            }
            None => warn!(
                sessions = map.len(),
                "Session limit reached but every session is busy"
            ),
        }
    }
}

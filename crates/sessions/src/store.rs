use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use {mediaferry_channels::ChatEvent, tracing::debug, uuid::Uuid};

use crate::state::{Session, SessionState, Transition};

/// In-memory sessions keyed by chat id.
///
/// Every operation takes the lock once and releases it before returning, so
/// callers never hold it across an await point.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply `event` to the session of `key` atomically.
    ///
    /// A start event creates (or replaces) the session; anything else for an
    /// unknown key is ignored. Sessions that fall back to idle are dropped.
    pub fn apply(&self, key: &str, event: &ChatEvent) -> Transition {
        let mut sessions = self.lock();
        let transition = match (sessions.get_mut(key), event) {
            (Some(session), _) => session.advance(event),
            (None, ChatEvent::Start) => {
                let mut session = Session::new();
                let transition = session.advance(event);
                sessions.insert(key.to_string(), session);
                transition
            },
            (None, _) => Transition::Ignored,
        };

        if sessions
            .get(key)
            .is_some_and(|s| s.state == SessionState::Idle)
        {
            sessions.remove(key);
        }

        if transition == Transition::Ignored {
            debug!(chat_id = key, ?event, "event ignored");
        }
        transition
    }

    /// Copy of the current session, if any.
    pub fn get(&self, key: &str) -> Option<Session> {
        self.lock().get(key).cloned()
    }

    /// Remove the session only if it is still the same incarnation.
    pub fn remove_if(&self, key: &str, generation: Uuid) -> bool {
        let mut sessions = self.lock();
        if sessions.get(key).is_some_and(|s| s.generation == generation) {
            sessions.remove(key);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

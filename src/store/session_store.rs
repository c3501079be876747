use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{SessionProfile, SessionRecord, Theme};
use crate::utils::Clock;

/// session id -> session record, with time-based expiry.
///
/// Every operation takes the lock once, so each read-modify-write is
/// linearizable per session id.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    fn is_expired(&self, record: &SessionRecord) -> bool {
        self.clock.now() - record.created_at >= self.ttl
    }

    /// Returns the live session for `cookie_session_id`, refreshing its
    /// `created_at`, or creates a new one from `profile` under a fresh id.
    ///
    /// Profile fields of an existing session are left untouched.
    pub fn create(&self, cookie_session_id: Option<&str>, profile: SessionProfile) -> String {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();

        if let Some(record) = cookie_session_id.and_then(|id| sessions.get_mut(id)) {
            if !self.is_expired(record) {
                record.created_at = now;
                debug!("session refreshed");
                return record.session_id.clone();
            }
        }

        let session_id = Uuid::new_v4().to_string();
        sessions.insert(
            session_id.clone(),
            SessionRecord::new(session_id.clone(), profile, now),
        );
        info!(sessions = sessions.len(), "session created");
        session_id
    }

    /// Expired sessions read as absent and are evicted on the way.
    pub fn get(&self, session_id: &str) -> Option<SessionRecord> {
        let mut sessions = self.sessions.lock();
        let record = sessions.get(session_id)?;
        if self.is_expired(record) {
            sessions.remove(session_id);
            debug!("evicted expired session");
            return None;
        }
        Some(record.clone())
    }

    /// Returns `false` when there was no such session.
    pub fn destroy(&self, session_id: &str) -> bool {
        let removed = self.sessions.lock().remove(session_id).is_some();
        if removed {
            info!("session destroyed");
        } else {
            debug!("no session found to destroy");
        }
        removed
    }

    /// Flips the theme and returns the new one.
    pub fn toggle_theme(&self, session_id: &str) -> Option<Theme> {
        let mut sessions = self.sessions.lock();
        let record = sessions.get(session_id)?;
        if self.is_expired(record) {
            sessions.remove(session_id);
            return None;
        }
        let record = sessions.get_mut(session_id)?;
        record.theme = record.theme.toggled();
        Some(record.theme)
    }

    /// Moves the session to a fresh id and deletes the old one. Call after a
    /// privilege change so a planted session id cannot ride along.
    pub fn regenerate(&self, old_id: &str) -> Option<String> {
        let mut sessions = self.sessions.lock();
        let mut record = sessions.remove(old_id)?;
        if self.is_expired(&record) {
            return None;
        }
        let new_id = Uuid::new_v4().to_string();
        record.session_id = new_id.clone();
        sessions.insert(new_id.clone(), record);
        info!("session regenerated");
        Some(new_id)
    }

    /// Drops every expired session and returns how many went.
    pub fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, record| !self.is_expired(record));
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

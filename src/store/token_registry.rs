use std::collections::HashMap;

use parking_lot::Mutex;

#[derive(Default)]
struct RegistryState {
    /// Refresh tokens that may still be exchanged, with their `exp`.
    refresh: HashMap<String, i64>,
    /// Access tokens revoked before their natural expiry, with their `exp`.
    revoked: HashMap<String, i64>,
}

/// Positive set of live refresh tokens and negative set of revoked access
/// tokens. Both live under one lock so a rotation's delete-then-insert is a
/// single atomic step.
#[derive(Default)]
pub struct TokenRegistry {
    state: Mutex<RegistryState>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_refresh(&self, token: &str, exp: i64) {
        self.state.lock().refresh.insert(token.to_owned(), exp);
    }

    pub fn contains_refresh(&self, token: &str) -> bool {
        self.state.lock().refresh.contains_key(token)
    }

    /// Removes `old` and registers `new` in one step. Returns `false` and
    /// leaves the registry untouched when `old` was not registered.
    pub fn replace_refresh(&self, old: &str, new: &str, new_exp: i64) -> bool {
        let mut state = self.state.lock();
        if state.refresh.remove(old).is_none() {
            return false;
        }
        state.refresh.insert(new.to_owned(), new_exp);
        true
    }

    /// Returns whether the token was registered.
    pub fn remove_refresh(&self, token: &str) -> bool {
        self.state.lock().refresh.remove(token).is_some()
    }

    /// Idempotent. Re-revoking keeps the later expiry.
    pub fn revoke_access(&self, token: &str, exp: i64) {
        let mut state = self.state.lock();
        let entry = state.revoked.entry(token.to_owned()).or_insert(exp);
        *entry = (*entry).max(exp);
    }

    pub fn is_revoked(&self, token: &str) -> bool {
        self.state.lock().revoked.contains_key(token)
    }

    /// Forgets refresh tokens and revocations whose tokens expired at or
    /// before `now` (unix seconds). Returns (refresh, revoked) counts dropped.
    pub fn purge_expired(&self, now: i64) -> (usize, usize) {
        let mut state = self.state.lock();
        let refresh_before = state.refresh.len();
        let revoked_before = state.revoked.len();
        state.refresh.retain(|_, exp| *exp > now);
        state.revoked.retain(|_, exp| *exp > now);
        (
            refresh_before - state.refresh.len(),
            revoked_before - state.revoked.len(),
        )
    }

    pub fn refresh_count(&self) -> usize {
        self.state.lock().refresh.len()
    }

    pub fn revoked_count(&self) -> usize {
        self.state.lock().revoked.len()
    }
}

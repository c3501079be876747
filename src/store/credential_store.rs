use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::models::CredentialRecord;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("an account is already registered for this email")]
    AlreadyRegistered,
    #[error("no account is registered for this email")]
    NotRegistered,
    #[error("wrong credentials")]
    WrongCredentials,
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl From<bcrypt::BcryptError> for CredentialError {
    fn from(err: bcrypt::BcryptError) -> Self {
        CredentialError::Hashing(err.to_string())
    }
}

impl From<tokio::task::JoinError> for CredentialError {
    fn from(err: tokio::task::JoinError) -> Self {
        CredentialError::Hashing(err.to_string())
    }
}

/// email -> bcrypt credential. Records are created once and never change.
///
/// Hashing and verification run on the blocking pool so a slow bcrypt round
/// never stalls other requests.
pub struct CredentialStore {
    records: Arc<Mutex<HashMap<String, CredentialRecord>>>,
    cost: u32,
    /// Verified against when the email is unknown, so both failures cost one
    /// bcrypt round at the configured cost.
    dummy_hash: OnceCell<String>,
}

impl CredentialStore {
    pub fn new(cost: u32) -> Self {
        if cost < bcrypt::DEFAULT_COST {
            warn!(
                cost,
                recommended = bcrypt::DEFAULT_COST,
                "bcrypt cost below the recommended minimum"
            );
        }
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            cost,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Stores a salted hash of `password` under `email`.
    pub async fn register(&self, email: &str, password: &str) -> Result<(), CredentialError> {
        if self.records.lock().contains_key(email) {
            return Err(CredentialError::AlreadyRegistered);
        }

        let password = password.to_owned();
        let cost = self.cost;
        let parts =
            tokio::task::spawn_blocking(move || bcrypt::hash_with_result(password, cost)).await??;
        let record = CredentialRecord {
            password_hash: parts.to_string(),
            salt: parts.get_salt(),
        };

        // Re-check under the lock: another registration may have won while we hashed.
        let mut records = self.records.lock();
        if records.contains_key(email) {
            return Err(CredentialError::AlreadyRegistered);
        }
        records.insert(email.to_owned(), record);
        drop(records);

        info!(email, "registered credential");
        Ok(())
    }

    async fn dummy_hash(&self) -> Result<String, CredentialError> {
        let cost = self.cost;
        let hash = self
            .dummy_hash
            .get_or_try_init(|| async move {
                let parts = tokio::task::spawn_blocking(move || {
                    bcrypt::hash_with_result(uuid::Uuid::new_v4().to_string(), cost)
                })
                .await??;
                Ok::<_, CredentialError>(parts.to_string())
            })
            .await?;
        Ok(hash.clone())
    }

    /// Checks `password` against the stored hash and returns the subject on success.
    ///
    /// An unknown email is checked against a throwaway hash first, so it takes
    /// as long as a wrong password.
    pub async fn verify(&self, email: &str, password: &str) -> Result<String, CredentialError> {
        let stored = self
            .records
            .lock()
            .get(email)
            .map(|record| record.password_hash.clone());
        let hash = match &stored {
            Some(hash) => hash.clone(),
            None => self.dummy_hash().await?,
        };

        let password = password.to_owned();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
        match (stored, matches) {
            (None, _) => {
                debug!(email, "verification for unregistered email");
                Err(CredentialError::NotRegistered)
            }
            (Some(_), true) => Ok(email.to_owned()),
            (Some(_), false) => {
                debug!(email, "password mismatch");
                Err(CredentialError::WrongCredentials)
            }
        }
    }

    #[cfg(test)]
    fn record(&self, email: &str) -> Option<CredentialRecord> {
        self.records.lock().get(email).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::new(4)
    }

    #[tokio::test]
    async fn register_then_verify() {
        let store = store();
        store.register("a@b.com", "pw").await.unwrap();

        let subject = store.verify("a@b.com", "pw").await.unwrap();
        assert_eq!(subject, "a@b.com");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let store = store();
        store.register("a@b.com", "pw").await.unwrap();

        let result = store.verify("a@b.com", "nope").await;
        assert!(matches!(result, Err(CredentialError::WrongCredentials)));
    }

    #[tokio::test]
    async fn unknown_email_is_not_registered() {
        let result = store().verify("ghost@b.com", "pw").await;
        assert!(matches!(result, Err(CredentialError::NotRegistered)));
    }

    #[tokio::test]
    async fn unknown_email_still_pays_for_bcrypt() {
        let store = CredentialStore::new(5);
        assert!(store.dummy_hash.get().is_none());

        let result = store.verify("ghost@b.com", "pw").await;
        assert!(matches!(result, Err(CredentialError::NotRegistered)));
        let dummy = store.dummy_hash.get().cloned().unwrap();
        assert!(dummy.starts_with("$2b$05$"));

        // Later misses reuse the same hash instead of minting another.
        store.verify("other@b.com", "pw").await.unwrap_err();
        assert_eq!(store.dummy_hash.get(), Some(&dummy));

        store.register("a@b.com", "pw").await.unwrap();
        let stored = store.record("a@b.com").unwrap().password_hash;
        assert!(stored.starts_with("$2b$05$"));
    }

    #[tokio::test]
    async fn second_registration_fails() {
        let store = store();
        store.register("a@b.com", "pw").await.unwrap();

        let result = store.register("a@b.com", "other").await;
        assert!(matches!(result, Err(CredentialError::AlreadyRegistered)));
        // The first password still works.
        assert!(store.verify("a@b.com", "pw").await.is_ok());
    }

    #[tokio::test]
    async fn stores_salted_hash_not_password() {
        let store = store();
        store.register("a@b.com", "hunter2").await.unwrap();
        store.register("c@d.com", "hunter2").await.unwrap();

        let first = store.record("a@b.com").unwrap();
        let second = store.record("c@d.com").unwrap();
        assert!(!first.password_hash.contains("hunter2"));
        assert!(first.password_hash.contains(&first.salt));
        assert_ne!(first.salt, second.salt);
        assert_ne!(first.password_hash, second.password_hash);
        assert!(!format!("{:?}", first).contains(&first.salt));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_have_one_winner() {
        let store = Arc::new(store());
        let attempts = (0..8).map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.register("race@b.com", &format!("pw{i}")).await })
        });

        let results = futures::future::join_all(attempts).await;
        let wins = results
            .into_iter()
            .map(|joined| joined.unwrap())
            .filter(Result::is_ok)
            .count();
        assert_eq!(wins, 1);
    }
}

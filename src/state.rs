//! Shared application state.
//!
//! Built once at startup and cloned into every route handler.

use std::sync::Arc;

use crate::config::ConfigV1;
use crate::middleware::RateLimiter;
use crate::store::{CredentialStore, SessionStore, TokenRegistry};
use crate::tokens::{KeyPair, TokenIssuer, TokenVerifier};
use crate::utils::Clock;

#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    pub sessions: Arc<SessionStore>,
    pub credentials: Arc<CredentialStore>,
    /// Signs and rotates tokens. Only the auth routes use it directly.
    pub issuer: Arc<TokenIssuer>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wires every store to one clock and one token registry.
    pub fn new(config: Arc<ConfigV1>, keys: KeyPair, clock: Arc<dyn Clock>) -> Self {
        let sessions = Arc::new(SessionStore::new(
            chrono::Duration::seconds(config.sessions.ttl_secs),
            clock.clone(),
        ));
        let credentials = Arc::new(CredentialStore::new(config.credentials.bcrypt_cost));
        let issuer = Arc::new(TokenIssuer::new(
            keys,
            &config.tokens,
            Arc::new(TokenRegistry::new()),
            clock,
        ));
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.max_requests));

        AppState {
            config,
            sessions,
            credentials,
            issuer,
            limiter,
        }
    }

    pub fn verifier(&self) -> Arc<TokenVerifier> {
        self.issuer.verifier()
    }
}

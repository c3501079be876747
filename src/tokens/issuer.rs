use std::sync::Arc;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::keys::KeyPair;
use super::verifier::TokenVerifier;
use super::TokenError;
use crate::config::TokenConfig;
use crate::models::{Claims, TokenKind, TokenPair};
use crate::store::TokenRegistry;
use crate::utils::Clock;

/// Mints access/refresh pairs and drives the refresh-token lifecycle:
/// Issued -> Rotated | Invalidated | Expired, all terminal.
pub struct TokenIssuer {
    key: EncodingKey,
    header: Header,
    issuer: String,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    verifier: Arc<TokenVerifier>,
}

impl TokenIssuer {
    pub fn new(
        keys: KeyPair,
        config: &TokenConfig,
        registry: Arc<TokenRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (signing, verifying) = keys.into_parts();
        let verifier = Arc::new(TokenVerifier::new(
            verifying,
            &config.issuer,
            registry,
            clock,
        ));
        Self {
            key: signing,
            header: Header::new(Algorithm::RS256),
            issuer: config.issuer.clone(),
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
            verifier,
        }
    }

    /// The verification half, safe to hand to components that must not sign.
    pub fn verifier(&self) -> Arc<TokenVerifier> {
        self.verifier.clone()
    }

    fn mint(&self, subject: &str, kind: TokenKind, now: i64) -> Result<(String, i64), TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        };
        let claims = Claims {
            sub: subject.to_owned(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now + ttl,
            jti: Uuid::new_v4().to_string(),
            typ: kind,
        };
        let token = encode(&self.header, &claims, &self.key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok((token, claims.exp))
    }

    /// Signs both tokens without touching the registry.
    fn mint_pair(&self, subject: &str) -> Result<(TokenPair, i64), TokenError> {
        let now = self.verifier.now();
        let (access_token, _) = self.mint(subject, TokenKind::Access, now)?;
        let (refresh_token, refresh_exp) = self.mint(subject, TokenKind::Refresh, now)?;
        Ok((
            TokenPair {
                access_token,
                refresh_token,
            },
            refresh_exp,
        ))
    }

    /// Fresh access and refresh token for `subject`; the refresh token is
    /// registered as valid.
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, TokenError> {
        let (pair, refresh_exp) = self.mint_pair(subject)?;
        self.verifier
            .registry()
            .register_refresh(&pair.refresh_token, refresh_exp);
        debug!(subject, "issued token pair");
        Ok(pair)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verifier.verify_access(token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verifier.verify_refresh(token)
    }

    /// Exchanges a registered refresh token for a new pair, exactly once.
    ///
    /// The successor is minted before the registry is touched; consuming the
    /// old token and registering the new one then happen under one lock, so
    /// of several concurrent rotations of the same token exactly one wins and
    /// the rest see [`TokenError::Unknown`].
    pub fn rotate_refresh(&self, old: &str) -> Result<TokenPair, TokenError> {
        let registry = self.verifier.registry();
        if !registry.contains_refresh(old) {
            warn!("rotation attempted with unregistered refresh token");
            return Err(TokenError::Unknown);
        }

        let claims = match self.verifier.decode(old, TokenKind::Refresh) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => {
                registry.remove_refresh(old);
                return Err(TokenError::Expired);
            }
            Err(e) => return Err(e),
        };

        let (pair, refresh_exp) = self.mint_pair(&claims.sub)?;
        if !registry.replace_refresh(old, &pair.refresh_token, refresh_exp) {
            warn!(subject = %claims.sub, "refresh token consumed concurrently");
            return Err(TokenError::Unknown);
        }
        info!(subject = %claims.sub, "rotated refresh token");
        Ok(pair)
    }

    /// Adds an access token to the revoked set. Never fails: unknown or
    /// malformed strings are recorded too, until one access lifetime from now.
    pub fn revoke(&self, access_token: &str) {
        let exp = match self.verifier.decode(access_token, TokenKind::Access) {
            Ok(claims) => claims.exp,
            Err(_) => self.verifier.now() + self.access_ttl_secs,
        };
        self.verifier.registry().revoke_access(access_token, exp);
        debug!("access token revoked");
    }

    /// Consumes a refresh token without a successor. Returns whether it was live.
    pub fn invalidate_refresh(&self, token: &str) -> bool {
        let removed = self.verifier.registry().remove_refresh(token);
        debug!(removed, "refresh token invalidated");
        removed
    }

    /// Drops registry entries for tokens that can no longer verify anyway.
    pub fn purge_expired(&self) -> (usize, usize) {
        self.verifier.registry().purge_expired(self.verifier.now())
    }
}

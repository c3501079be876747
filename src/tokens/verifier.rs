use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use tracing::debug;

use super::TokenError;
use crate::models::{Claims, TokenKind};
use crate::store::TokenRegistry;
use crate::utils::Clock;

/// Checks tokens with the public key only. Components that must accept
/// tokens but never mint them get one of these instead of a `TokenIssuer`.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
    registry: Arc<TokenRegistry>,
    clock: Arc<dyn Clock>,
}

impl TokenVerifier {
    pub fn new(
        key: DecodingKey,
        issuer: &str,
        registry: Arc<TokenRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        // Expiry is judged against our own clock in `decode`.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[issuer]);
        Self {
            key,
            validation,
            registry,
            clock,
        }
    }

    pub(crate) fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    pub(crate) fn now(&self) -> i64 {
        self.clock.now().timestamp()
    }

    /// Signature, issuer, kind and expiry; no registry lookups.
    pub(crate) fn decode(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            debug!(error = %e, "token failed validation");
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;
        let claims = data.claims;
        if claims.typ != kind {
            debug!(expected = ?kind, actual = ?claims.typ, "token kind mismatch");
            return Err(TokenError::Invalid);
        }
        if claims.exp <= self.now() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    /// Accepts an access token iff it is not revoked, verifies, and has not expired.
    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        if self.registry.is_revoked(token) {
            return Err(TokenError::Revoked);
        }
        self.decode(token, TokenKind::Access)
    }

    /// A refresh token must both verify and still be registered. An expired
    /// one is dropped from the registry on the way out.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        if !self.registry.contains_refresh(token) {
            return Err(TokenError::Unknown);
        }
        self.decode(token, TokenKind::Refresh).inspect_err(|e| {
            if matches!(e, TokenError::Expired) {
                self.registry.remove_refresh(token);
            }
        })
    }
}

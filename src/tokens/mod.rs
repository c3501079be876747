//! Signed access/refresh tokens.
//!
//! RS256 throughout: [`TokenIssuer`] owns the private key and the refresh
//! lifecycle, [`TokenVerifier`] owns only the public key and is what request
//! guards receive. Both consult the shared [`TokenRegistry`](crate::store::TokenRegistry).

pub mod issuer;
pub mod keys;
pub mod verifier;

use thiserror::Error;

pub use issuer::TokenIssuer;
pub use keys::{KeyError, KeyPair};
pub use verifier::TokenVerifier;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token revoked")]
    Revoked,
    #[error("token invalid")]
    Invalid,
    /// A refresh token that is not (or no longer) registered. Possibly a replay.
    #[error("unknown refresh token")]
    Unknown,
    #[error("token signing failed: {0}")]
    Signing(String),
}

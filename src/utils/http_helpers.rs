use std::fmt;

use http::StatusCode;
use serde_json::json;
use tracing::error;

use crate::store::CredentialError;
use crate::tokens::TokenError;

/// A general purpose HTTP error a handler can fail with.
///
/// The chain executor renders it as the response when nothing was emitted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HTTPError {
    pub status: StatusCode,
    pub message: String,
}

impl HTTPError {
    /// Creates a new HTTP error with the given status code and message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        HTTPError {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// Hides the underlying cause from the client; log it before calling this.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    /// JSON body for this error.
    pub fn body(&self) -> String {
        json!({ "error": self.message }).to_string()
    }
}

impl fmt::Display for HTTPError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for HTTPError {}

impl From<CredentialError> for HTTPError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::AlreadyRegistered => HTTPError::bad_request("User already exists"),
            CredentialError::NotRegistered | CredentialError::WrongCredentials => {
                HTTPError::unauthorized("Invalid credentials")
            }
            CredentialError::Hashing(cause) => {
                error!(error = %cause, "credential hashing failed");
                HTTPError::internal()
            }
        }
    }
}

impl From<TokenError> for HTTPError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => HTTPError::unauthorized("Token expired"),
            TokenError::Revoked | TokenError::Unknown => HTTPError::forbidden("Token revoked"),
            TokenError::Invalid => HTTPError::forbidden("Invalid token"),
            TokenError::Signing(cause) => {
                error!(error = %cause, "token signing failed");
                HTTPError::internal()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_escapes_message() {
        let err = HTTPError::bad_request("bad \"quote\"");
        let parsed: serde_json::Value = serde_json::from_str(&err.body()).unwrap();
        assert_eq!(parsed["error"], "bad \"quote\"");
    }

    #[test]
    fn internal_hides_detail() {
        let err = HTTPError::internal();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn credential_errors_map_to_statuses() {
        assert_eq!(
            HTTPError::from(CredentialError::AlreadyRegistered).status,
            StatusCode::BAD_REQUEST
        );
        let not_registered = HTTPError::from(CredentialError::NotRegistered);
        let wrong = HTTPError::from(CredentialError::WrongCredentials);
        assert_eq!(not_registered, wrong);
        assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn token_errors_map_to_statuses() {
        assert_eq!(HTTPError::from(TokenError::Expired).status, StatusCode::UNAUTHORIZED);
        assert_eq!(HTTPError::from(TokenError::Unknown).message, "Token revoked");
        assert_eq!(HTTPError::from(TokenError::Invalid).status, StatusCode::FORBIDDEN);
        assert_eq!(
            HTTPError::from(TokenError::Signing("boom".into())),
            HTTPError::internal()
        );
    }
}

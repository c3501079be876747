use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by both access and refresh tokens.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// The subject, i.e. the email the credential was registered under.
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token, so two tokens minted in the same second differ.
    pub jti: String,
    pub typ: TokenKind,
}

/// What `issue_pair` and `rotate_refresh` hand back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

use std::fmt;

/// A stored credential. Only the bcrypt output is kept, never the password.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Full modular-crypt bcrypt string (`$2b$<cost>$<salt><hash>`).
    pub password_hash: String,
    /// The 22-character bcrypt salt, also embedded in `password_hash`.
    pub salt: String,
}

// Keep hashes out of debug output and therefore out of logs.
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("password_hash", &"<redacted>")
            .field("salt", &"<redacted>")
            .finish()
    }
}

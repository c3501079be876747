use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Locations of the RSA key pair. The pair itself is produced by external
/// tooling, e.g. `openssl genpkey -algorithm RSA -pkeyopt rsa_keygen_bits:2048`.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct KeyConfig {
    /// PKCS#8 or PKCS#1 PEM private key, used to sign tokens.
    pub private_key_path: String,
    /// SPKI or PKCS#1 PEM public key, used to verify tokens.
    pub public_key_path: String,
}

/// Lifetimes and claims of issued tokens.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(default)]
pub struct TokenConfig {
    /// `iss` claim written into and required from every token.
    pub issuer: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    /// Also read the access token from an `accessToken` JSON body field when
    /// no bearer header is present.
    pub accept_body_token: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: env!("CARGO_PKG_NAME").to_string(),
            access_ttl_secs: 15 * 60,
            refresh_ttl_secs: 7 * 24 * 60 * 60,
            accept_body_token: false,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(default)]
pub struct CredentialConfig {
    /// bcrypt work factor. Values below 12 are only meant for tests.
    pub bcrypt_cost: u32,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

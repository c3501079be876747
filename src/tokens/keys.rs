use std::path::Path;

use jsonwebtoken::{DecodingKey, EncodingKey};
use thiserror::Error;
use tracing::info;

use crate::config::KeyConfig;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to read key file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid RSA {kind} key: {source}")]
    Parse {
        kind: &'static str,
        #[source]
        source: jsonwebtoken::errors::Error,
    },
}

/// The process-wide RSA identity. The private half signs, the public half
/// verifies, and [`KeyPair::into_parts`] lets each go to a different owner.
pub struct KeyPair {
    signing: EncodingKey,
    verifying: DecodingKey,
}

impl KeyPair {
    pub fn from_pem(private_pem: &[u8], public_pem: &[u8]) -> Result<Self, KeyError> {
        let signing = EncodingKey::from_rsa_pem(private_pem).map_err(|source| KeyError::Parse {
            kind: "private",
            source,
        })?;
        let verifying =
            DecodingKey::from_rsa_pem(public_pem).map_err(|source| KeyError::Parse {
                kind: "public",
                source,
            })?;
        Ok(Self { signing, verifying })
    }

    pub fn load(config: &KeyConfig) -> Result<Self, KeyError> {
        let private_pem = read(&config.private_key_path)?;
        let public_pem = read(&config.public_key_path)?;
        let pair = Self::from_pem(&private_pem, &public_pem)?;
        info!(
            private_key = %config.private_key_path,
            public_key = %config.public_key_path,
            "loaded token signing key pair"
        );
        Ok(pair)
    }

    pub fn into_parts(self) -> (EncodingKey, DecodingKey) {
        (self.signing, self.verifying)
    }
}

fn read(path: &str) -> Result<Vec<u8>, KeyError> {
    std::fs::read(Path::new(path)).map_err(|source| KeyError::Read {
        path: path.to_owned(),
        source,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const PRIVATE_PEM: &str = include_str!("../../tests/fixtures/private.pem");
    pub const PUBLIC_PEM: &str = include_str!("../../tests/fixtures/public.pem");
    pub const OTHER_PUBLIC_PEM: &str = include_str!("../../tests/fixtures/other_public.pem");
}

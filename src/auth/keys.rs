//! Verification key material.

use std::fmt;
use std::path::Path;

use jsonwebtoken::{Algorithm, DecodingKey};

use crate::config::{loader::read_file, AuthConfig, ConfigError};

const HMAC_ALGORITHMS: &[Algorithm] = &[Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

const RSA_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

/// The one key used to verify caller tokens.
///
/// Decided once at startup. `None` rejects every token.
#[derive(Clone)]
pub enum VerificationKey {
    /// Shared HMAC secret.
    Symmetric(DecodingKey),
    /// RSA public key.
    Asymmetric(DecodingKey),
    None,
}

impl VerificationKey {
    pub fn symmetric(secret: &[u8]) -> Self {
        Self::Symmetric(DecodingKey::from_secret(secret))
    }

    pub fn asymmetric_from_pem(pem: &[u8]) -> Result<Self, jsonwebtoken::errors::Error> {
        DecodingKey::from_rsa_pem(pem).map(Self::Asymmetric)
    }

    /// Load whichever key file the configuration names.
    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        match (&config.jwt_secret_file, &config.jwt_public_key_file) {
            (Some(path), None) => Ok(Self::symmetric(&load_secret(path)?)),
            (None, Some(path)) => {
                let pem = read_file(path)?;
                Self::asymmetric_from_pem(&pem).map_err(|e| ConfigError::Key {
                    path: path.clone(),
                    reason: e.to_string(),
                })
            }
            (None, None) => Ok(Self::None),
            // Rejected by validation; refuse rather than guess.
            (Some(path), Some(_)) => Err(ConfigError::Key {
                path: path.clone(),
                reason: "both a secret and a public key are configured".to_string(),
            }),
        }
    }

    /// Algorithms accepted with this key. Empty for `None`.
    pub fn algorithms(&self) -> &'static [Algorithm] {
        match self {
            Self::Symmetric(_) => HMAC_ALGORITHMS,
            Self::Asymmetric(_) => RSA_ALGORITHMS,
            Self::None => &[],
        }
    }

    pub fn decoding_key(&self) -> Option<&DecodingKey> {
        match self {
            Self::Symmetric(key) | Self::Asymmetric(key) => Some(key),
            Self::None => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Symmetric(_) => "symmetric",
            Self::Asymmetric(_) => "asymmetric",
            Self::None => "none",
        }
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VerificationKey").field(&self.kind()).finish()
    }
}

/// Secret files are used as raw bytes, minus a trailing newline.
pub fn load_secret(path: &Path) -> Result<Vec<u8>, ConfigError> {
    let mut secret = read_file(path)?;
    while matches!(secret.last(), Some(&(b'\n' | b'\r'))) {
        secret.pop();
    }
    if secret.is_empty() {
        return Err(ConfigError::Key {
            path: path.to_path_buf(),
            reason: "secret is empty".to_string(),
        });
    }
    Ok(secret)
}

//! Caller token verification.
//!
//! # Responsibilities
//! - Check the token signature with the configured key
//! - Enforce `exp` / `nbf` with zero leeway and an optional audience
//! - Decide whether the token's scope covers the requested method and path
//!
//! # Design Decisions
//! - The key variant decides the accepted algorithm family; the token header
//!   never selects the key
//! - Every failure is distinguishable here for logging, but callers expose a
//!   single generic error

use std::collections::HashSet;

use axum::http::Method;
use jsonwebtoken::{decode, errors::ErrorKind, Validation};
use thiserror::Error;

use crate::auth::claims::{ScopeMismatch, TokenClaims, TokenScope};
use crate::auth::keys::VerificationKey;

/// Why a token was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("no verification key configured")]
    NoKeyConfigured,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("unsupported signing algorithm")]
    UnsupportedAlgorithm,

    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("audience mismatch")]
    InvalidAudience,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("method {0} outside token scope")]
    MethodNotAllowed(String),

    #[error("path {0} outside token scope")]
    PathNotAllowed(String),

    #[error("unscoped tokens are not accepted")]
    UnscopedRejected,
}

impl VerifyError {
    /// Coarse category used for metrics and log fields.
    pub fn category(&self) -> &'static str {
        match self {
            VerifyError::NoKeyConfigured => "no-key",
            VerifyError::InvalidSignature | VerifyError::UnsupportedAlgorithm => "invalid-signature",
            VerifyError::MethodNotAllowed(_)
            | VerifyError::PathNotAllowed(_)
            | VerifyError::UnscopedRejected => "invalid-scope",
            VerifyError::Expired
            | VerifyError::NotYetValid
            | VerifyError::InvalidAudience
            | VerifyError::Malformed(_) => "malformed",
        }
    }
}

impl From<ScopeMismatch> for VerifyError {
    fn from(mismatch: ScopeMismatch) -> Self {
        match mismatch {
            ScopeMismatch::Method(m) => VerifyError::MethodNotAllowed(m),
            ScopeMismatch::Path(p) => VerifyError::PathNotAllowed(p),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for VerifyError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => VerifyError::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                VerifyError::UnsupportedAlgorithm
            }
            ErrorKind::ExpiredSignature => VerifyError::Expired,
            ErrorKind::ImmatureSignature => VerifyError::NotYetValid,
            ErrorKind::InvalidAudience => VerifyError::InvalidAudience,
            _ => VerifyError::Malformed(err.to_string()),
        }
    }
}

/// What a successfully verified token grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    /// Token carried scope claims and they cover the request.
    Scoped(TokenScope),
    /// Token carried no scope claims; valid for the whole protected prefix.
    Unscoped,
}

#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub subject: Option<String>,
    pub grant: Grant,
}

/// Verifies caller tokens for one protected path prefix.
#[derive(Debug, Clone)]
pub struct Verifier {
    key: VerificationKey,
    validation: Option<Validation>,
    api_path: String,
    allow_unscoped: bool,
}

impl Verifier {
    pub fn new(
        key: VerificationKey,
        api_path: impl Into<String>,
        audience: Option<&str>,
        allow_unscoped: bool,
    ) -> Self {
        let validation = key.algorithms().first().map(|first| {
            let mut validation = Validation::new(*first);
            validation.algorithms = key.algorithms().to_vec();
            validation.leeway = 0;
            validation.validate_exp = true;
            validation.validate_nbf = true;
            validation.required_spec_claims = HashSet::new();
            match audience {
                Some(aud) => validation.set_audience(&[aud]),
                None => validation.validate_aud = false,
            }
            validation
        });

        Self {
            key,
            validation,
            api_path: api_path.into(),
            allow_unscoped,
        }
    }

    pub fn key(&self) -> &VerificationKey {
        &self.key
    }

    /// Verify `token` for a `method` request to the full request `path`.
    pub fn verify(&self, token: &str, method: &Method, path: &str) -> Result<VerifiedToken, VerifyError> {
        let (Some(key), Some(validation)) = (self.key.decoding_key(), &self.validation) else {
            return Err(VerifyError::NoKeyConfigured);
        };

        let claims = decode::<TokenClaims>(token, key, validation)?.claims;

        if !path.starts_with(&self.api_path) {
            return Err(VerifyError::PathNotAllowed(path.to_string()));
        }

        let grant = match TokenScope::from_claims(&claims) {
            Some(scope) => {
                scope.permits(method, path)?;
                Grant::Scoped(scope)
            }
            None if self.allow_unscoped => Grant::Unscoped,
            None => return Err(VerifyError::UnscopedRejected),
        };

        Ok(VerifiedToken {
            subject: claims.sub,
            grant,
        })
    }
}

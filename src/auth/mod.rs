//! Caller authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request headers
//!     → extractor.rs (Authorization header, then session cookie)
//!     → verifier.rs (signature, expiry, scope) using keys.rs
//!     → claims.rs (scope claims carried by the token)
//! ```

pub mod claims;
pub mod extractor;
pub mod keys;
pub mod verifier;

pub use claims::{MethodList, TokenClaims, TokenScope};
pub use extractor::{extract_credential, Credential, CredentialSource, SESSION_COOKIE_NAME};
pub use keys::VerificationKey;
pub use verifier::{Grant, VerifiedToken, Verifier, VerifyError};

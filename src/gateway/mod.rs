//! Gateway decision subsystem.
//!
//! # Data Flow
//! ```text
//! Request
//!     → path.rs (non-canonical paths answered with 301 to the clean form)
//!     → pipeline.rs (ordered rules, first decision wins)
//!     → rules.rs (login-page, credential, pass-through | protected-prefix, verify)
//!     → middleware.rs (apply decision: forward, 307 to login, or 403)
//! ```

pub mod middleware;
pub mod path;
pub mod pipeline;
pub mod rules;

pub use middleware::gateway_middleware;
pub use path::clean_path;
pub use pipeline::{Decision, DenyReason, Evaluation, OutboundIdentity, Pipeline, RequestContext, Rule, Step};
pub use rules::{
    CredentialRule, LoginPageRule, PassThroughRule, PipelineSettings, ProtectedPrefixRule,
    VerificationMode, VerifyRule,
};

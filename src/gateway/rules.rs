//! The gateway's decision rules.

use std::sync::Arc;

use crate::auth::{Grant, Verifier};
use crate::gateway::pipeline::{
    Decision, DenyReason, OutboundIdentity, Pipeline, RequestContext, Rule, Step,
};

/// Lets the static login page through without a credential.
#[derive(Debug, Clone)]
pub struct LoginPageRule {
    path: String,
}

impl LoginPageRule {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Rule for LoginPageRule {
    fn name(&self) -> &'static str {
        "login-page"
    }

    fn evaluate(&self, ctx: &mut RequestContext<'_>) -> Step {
        if ctx.path == self.path {
            Step::Decide(Decision::Forward(None))
        } else {
            Step::Continue
        }
    }
}

/// Requires a caller credential; redirects or denies without one.
#[derive(Debug, Clone)]
pub struct CredentialRule {
    /// Set in interactive mode.
    login_redirect: Option<String>,
}

impl CredentialRule {
    pub fn interactive(login_endpoint: impl Into<String>) -> Self {
        Self {
            login_redirect: Some(login_endpoint.into()),
        }
    }

    pub fn headless() -> Self {
        Self { login_redirect: None }
    }
}

impl Rule for CredentialRule {
    fn name(&self) -> &'static str {
        "credential"
    }

    fn evaluate(&self, ctx: &mut RequestContext<'_>) -> Step {
        if ctx.extract().is_some() {
            return Step::Continue;
        }
        match &self.login_redirect {
            Some(location) => Step::Decide(Decision::Redirect(location.clone())),
            None => Step::Decide(Decision::Deny(DenyReason::MissingCredential)),
        }
    }
}

/// Forwards the caller's own credential without verifying it.
#[derive(Debug, Clone, Default)]
pub struct PassThroughRule;

impl Rule for PassThroughRule {
    fn name(&self) -> &'static str {
        "pass-through"
    }

    fn evaluate(&self, ctx: &mut RequestContext<'_>) -> Step {
        match ctx.credential() {
            Some(credential) => Step::Decide(Decision::Forward(Some(OutboundIdentity::Caller(
                credential.token().to_string(),
            )))),
            None => Step::Continue,
        }
    }
}

/// Lets non-API paths through with credentials untouched.
#[derive(Debug, Clone)]
pub struct ProtectedPrefixRule {
    api_path: String,
}

impl ProtectedPrefixRule {
    pub fn new(api_path: impl Into<String>) -> Self {
        Self {
            api_path: api_path.into(),
        }
    }

    /// Strictly longer than the prefix and starting with it.
    pub fn is_protected(&self, path: &str) -> bool {
        path.len() > self.api_path.len() && path.starts_with(&self.api_path)
    }
}

impl Rule for ProtectedPrefixRule {
    fn name(&self) -> &'static str {
        "protected-prefix"
    }

    fn evaluate(&self, ctx: &mut RequestContext<'_>) -> Step {
        if self.is_protected(ctx.path) {
            Step::Continue
        } else {
            Step::Decide(Decision::Forward(None))
        }
    }
}

/// Verifies the caller token and swaps in the service credential.
#[derive(Debug, Clone)]
pub struct VerifyRule {
    verifier: Verifier,
    service_credential: Arc<str>,
}

impl VerifyRule {
    pub fn new(verifier: Verifier, service_credential: Arc<str>) -> Self {
        Self {
            verifier,
            service_credential,
        }
    }
}

impl Rule for VerifyRule {
    fn name(&self) -> &'static str {
        "verify"
    }

    fn evaluate(&self, ctx: &mut RequestContext<'_>) -> Step {
        let Some(credential) = ctx.credential() else {
            return Step::Decide(Decision::Deny(DenyReason::MissingCredential));
        };

        match self.verifier.verify(credential.token(), ctx.method, ctx.path) {
            Ok(verified) => {
                tracing::debug!(
                    subject = verified.subject.as_deref().unwrap_or("-"),
                    scoped = matches!(verified.grant, Grant::Scoped(_)),
                    source = %credential.source(),
                    "Token verified"
                );
                Step::Decide(Decision::Forward(Some(OutboundIdentity::Service(
                    Arc::clone(&self.service_credential),
                ))))
            }
            Err(e) => {
                tracing::warn!(
                    reason = %e,
                    category = e.category(),
                    method = %ctx.method,
                    path = %ctx.path,
                    source = %credential.source(),
                    "Token rejected"
                );
                Step::Decide(Decision::Deny(DenyReason::VerificationFailed(e)))
            }
        }
    }
}

/// How verified callers are represented upstream.
#[derive(Debug, Clone)]
pub enum VerificationMode {
    /// Trust the caller's token and forward it as-is.
    PassThrough,
    /// Verify the caller's token and forward the service credential.
    Translate {
        verifier: Verifier,
        service_credential: Arc<str>,
    },
}

/// Inputs for the standard rule order.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub login_page: String,
    /// Login endpoint for interactive mode, `None` for headless.
    pub interactive_login: Option<String>,
    pub api_path: String,
    pub mode: VerificationMode,
}

impl Pipeline {
    /// login-page → credential → (pass-through | protected-prefix → verify)
    pub fn standard(settings: PipelineSettings) -> Self {
        let mut rules: Vec<Box<dyn Rule>> = vec![
            Box::new(LoginPageRule::new(settings.login_page)),
            Box::new(match settings.interactive_login {
                Some(endpoint) => CredentialRule::interactive(endpoint),
                None => CredentialRule::headless(),
            }),
        ];

        match settings.mode {
            VerificationMode::PassThrough => rules.push(Box::new(PassThroughRule)),
            VerificationMode::Translate {
                verifier,
                service_credential,
            } => {
                rules.push(Box::new(ProtectedPrefixRule::new(settings.api_path)));
                rules.push(Box::new(VerifyRule::new(verifier, service_credential)));
            }
        }

        Pipeline::new(rules)
    }
}

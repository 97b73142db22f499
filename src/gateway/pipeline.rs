//! Ordered decision pipeline.
//!
//! Each request is evaluated by a fixed list of named rules. The first rule
//! that returns a decision wins; a request that no rule decides is denied.

use std::fmt;
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue, Method};

use crate::auth::{extract_credential, Credential, VerifyError};
use crate::error::GatewayError;

/// The `Authorization` value attached before forwarding.
#[derive(Clone, PartialEq, Eq)]
pub enum OutboundIdentity {
    /// The caller's own credential, forwarded verbatim.
    Caller(String),
    /// The gateway's service credential.
    Service(Arc<str>),
}

impl OutboundIdentity {
    pub fn token(&self) -> &str {
        match self {
            OutboundIdentity::Caller(token) => token.as_str(),
            OutboundIdentity::Service(token) => token.as_ref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OutboundIdentity::Caller(_) => "caller",
            OutboundIdentity::Service(_) => "service",
        }
    }

    /// `Bearer <token>`, marked sensitive so it is never logged by tower-http.
    pub fn header_value(&self) -> Option<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.token())).ok()?;
        value.set_sensitive(true);
        Some(value)
    }
}

impl fmt::Debug for OutboundIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OutboundIdentity").field(&self.kind()).finish()
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    MissingCredential,
    VerificationFailed(VerifyError),
    /// No rule reached a decision.
    Undecided,
}

impl From<DenyReason> for GatewayError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::MissingCredential => GatewayError::MissingCredential,
            DenyReason::VerificationFailed(e) => GatewayError::VerificationFailed(e),
            DenyReason::Undecided => GatewayError::VerificationFailed(VerifyError::Malformed(
                "no rule authorized the request".to_string(),
            )),
        }
    }
}

/// Outcome for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Pass the request on. `None` leaves its credentials untouched.
    Forward(Option<OutboundIdentity>),
    /// 307 to the given location.
    Redirect(String),
    Deny(DenyReason),
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Forward(Some(_)) => "forward",
            Decision::Forward(None) => "forward-unauthenticated",
            Decision::Redirect(_) => "redirect",
            Decision::Deny(_) => "deny",
        }
    }
}

/// Result of a single rule.
#[derive(Debug)]
pub enum Step {
    Continue,
    Decide(Decision),
}

/// Per-request view handed to each rule.
pub struct RequestContext<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub headers: &'a HeaderMap,
    credential: Option<Credential>,
    extracted: bool,
}

impl<'a> RequestContext<'a> {
    pub fn new(method: &'a Method, path: &'a str, headers: &'a HeaderMap) -> Self {
        Self {
            method,
            path,
            headers,
            credential: None,
            extracted: false,
        }
    }

    /// Run the extractor. Idempotent.
    pub fn extract(&mut self) -> Option<&Credential> {
        if !self.extracted {
            self.credential = extract_credential(self.headers);
            self.extracted = true;
        }
        self.credential.as_ref()
    }

    /// The credential found by [`RequestContext::extract`], if it ran.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }
}

/// One decision step.
pub trait Rule: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn evaluate(&self, ctx: &mut RequestContext<'_>) -> Step;
}

/// Decision plus the rule that made it.
#[derive(Debug)]
pub struct Evaluation {
    pub rule: &'static str,
    pub decision: Decision,
}

/// Runs rules in order, first decision wins.
#[derive(Debug)]
pub struct Pipeline {
    rules: Vec<Box<dyn Rule>>,
}

impl Pipeline {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn evaluate(&self, ctx: &mut RequestContext<'_>) -> Evaluation {
        for rule in &self.rules {
            if let Step::Decide(decision) = rule.evaluate(ctx) {
                tracing::debug!(
                    rule = rule.name(),
                    decision = decision.label(),
                    method = %ctx.method,
                    path = %ctx.path,
                    "Gateway decision"
                );
                return Evaluation {
                    rule: rule.name(),
                    decision,
                };
            }
        }

        tracing::warn!(method = %ctx.method, path = %ctx.path, "No rule decided, denying");
        Evaluation {
            rule: "fallthrough",
            decision: Decision::Deny(DenyReason::Undecided),
        }
    }
}

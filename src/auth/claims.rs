//! Token claims and the scope they carry.

use axum::http::Method;
use serde::{Deserialize, Serialize};

/// Claims read from (and written into) caller tokens.
///
/// `exp` and `nbf` are enforced by the JWT library; they are kept here so
/// the minting tool can set them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,

    /// HTTP methods the token may be used with.
    #[serde(
        rename = "allowedAPIMethods",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub allowed_methods: Option<MethodList>,

    /// Path prefix the token may be used under, matched against the full
    /// request path.
    #[serde(
        rename = "allowedAPIPath",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub allowed_path: Option<String>,
}

/// Method claim, either `"GET,LIST"` or `["GET", "LIST"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MethodList {
    Csv(String),
    List(Vec<String>),
}

impl MethodList {
    /// Normalized, upper-cased, empty entries dropped.
    pub fn normalized(&self) -> Vec<String> {
        let entries: Vec<&str> = match self {
            MethodList::Csv(csv) => csv.split(',').collect(),
            MethodList::List(list) => list.iter().map(String::as_str).collect(),
        };
        entries
            .into_iter()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_ascii_uppercase)
            .collect()
    }
}

/// Restrictions a scoped token places on the requests it authorizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenScope {
    /// `None` means any method.
    methods: Option<Vec<String>>,
    /// `None` means the whole protected prefix.
    path_prefix: Option<String>,
}

/// Why a scoped token does not cover a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeMismatch {
    Method(String),
    Path(String),
}

impl TokenScope {
    /// `None` when the claims carry no scope at all.
    pub fn from_claims(claims: &TokenClaims) -> Option<Self> {
        if claims.allowed_methods.is_none() && claims.allowed_path.is_none() {
            return None;
        }
        Some(Self {
            methods: claims.allowed_methods.as_ref().map(MethodList::normalized),
            path_prefix: claims.allowed_path.clone(),
        })
    }

    pub fn methods(&self) -> Option<&[String]> {
        self.methods.as_deref()
    }

    pub fn path_prefix(&self) -> Option<&str> {
        self.path_prefix.as_deref()
    }

    /// Check a request against this scope.
    pub fn permits(&self, method: &Method, path: &str) -> Result<(), ScopeMismatch> {
        if let Some(methods) = &self.methods {
            if !methods.iter().any(|m| m.eq_ignore_ascii_case(method.as_str())) {
                return Err(ScopeMismatch::Method(method.to_string()));
            }
        }
        if let Some(prefix) = &self.path_prefix {
            if !path.starts_with(prefix.as_str()) {
                return Err(ScopeMismatch::Path(path.to_string()));
            }
        }
        Ok(())
    }
}

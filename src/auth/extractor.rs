//! Caller credential extraction.
//!
//! Precedence is strict: `Authorization: Bearer <token>` first, then the
//! session cookie. Query strings and bodies are never consulted here.

use std::fmt;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum_extra::extract::cookie::CookieJar;

/// Name of the cookie carrying the caller credential between requests.
pub const SESSION_COOKIE_NAME: &str = "kube-auth-gateway-session-token";

const BEARER_PREFIX: &str = "Bearer ";

/// Where a credential was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    AuthorizationHeader,
    SessionCookie,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::AuthorizationHeader => write!(f, "authorization-header"),
            CredentialSource::SessionCookie => write!(f, "session-cookie"),
        }
    }
}

/// An opaque bearer string presented by the caller.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    source: CredentialSource,
}

impl Credential {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn into_token(self) -> String {
        self.token
    }
}

// Tokens never show up in logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("source", &self.source)
            .field("len", &self.token.len())
            .finish_non_exhaustive()
    }
}

/// Pull the caller credential out of request headers.
///
/// Returns `None` when neither source carries a non-empty value; callers
/// decide whether that is an error.
pub fn extract_credential(headers: &HeaderMap) -> Option<Credential> {
    if let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .filter(|t| !t.is_empty())
    {
        return Some(Credential {
            token: token.to_string(),
            source: CredentialSource::AuthorizationHeader,
        });
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value())
        .filter(|v| !v.is_empty())
        .map(|v| Credential {
            token: v.to_string(),
            source: CredentialSource::SessionCookie,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderValue};

    fn headers(pairs: &[(axum::http::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn header_wins_over_cookie() {
        let map = headers(&[
            (AUTHORIZATION, "Bearer from-header"),
            (COOKIE, &format!("{SESSION_COOKIE_NAME}=from-cookie")),
        ]);
        let credential = extract_credential(&map).unwrap();
        assert_eq!(credential.token(), "from-header");
        assert_eq!(credential.source(), CredentialSource::AuthorizationHeader);
    }

    #[test]
    fn cookie_used_without_header() {
        let map = headers(&[(COOKIE, &format!("theme=dark; {SESSION_COOKIE_NAME}=abc123"))]);
        let credential = extract_credential(&map).unwrap();
        assert_eq!(credential.token(), "abc123");
        assert_eq!(credential.source(), CredentialSource::SessionCookie);
    }

    #[test]
    fn nothing_found() {
        assert!(extract_credential(&HeaderMap::new()).is_none());
    }

    #[test]
    fn empty_cookie_is_not_a_credential() {
        let map = headers(&[(COOKIE, &format!("{SESSION_COOKIE_NAME}="))]);
        assert!(extract_credential(&map).is_none());
    }

    #[test]
    fn prefix_is_case_sensitive() {
        let map = headers(&[(AUTHORIZATION, "bearer lowercase")]);
        assert!(extract_credential(&map).is_none());

        let map = headers(&[(AUTHORIZATION, "Basic dXNlcjpwYXNz")]);
        assert!(extract_credential(&map).is_none());
    }

    #[test]
    fn empty_bearer_falls_back_to_cookie() {
        let map = headers(&[
            (AUTHORIZATION, "Bearer "),
            (COOKIE, &format!("{SESSION_COOKIE_NAME}=cookie-token")),
        ]);
        assert_eq!(extract_credential(&map).unwrap().token(), "cookie-token");
    }

    #[test]
    fn header_remainder_is_returned_verbatim() {
        let map = headers(&[(AUTHORIZATION, "Bearer a.b.c with spaces")]);
        assert_eq!(extract_credential(&map).unwrap().token(), "a.b.c with spaces");
    }

    #[test]
    fn debug_hides_token() {
        let map = headers(&[(AUTHORIZATION, "Bearer topsecret")]);
        let rendered = format!("{:?}", extract_credential(&map).unwrap());
        assert!(!rendered.contains("topsecret"));
    }
}

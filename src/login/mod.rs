//! Browser login endpoints.
//!
//! # Data Flow
//! ```text
//! GET  login path     → clear session cookie → 302 consent URL (oauth.rs)
//! GET  callback path  → code exchange (oauth.rs) → session cookie → 302 /
//! GET/POST token path → session cookie from a pasted token → 302 `then`
//! ```
//!
//! These routes sit outside the decision middleware; they are reachable
//! without a credential.

pub mod cookie;
pub mod oauth;

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::CookieJar;
use rand::Rng;
use serde::Deserialize;

use crate::config::ServerConfig;
use crate::error::GatewayError;
use crate::http::response::found;
use crate::observability::metrics;

use self::cookie::{clear_oauth_state_cookie, oauth_state_cookie, session_cookie, OAUTH_STATE_COOKIE};
pub use self::oauth::{discover, ExchangeError, OAuthClient, ServerMetadata};

/// State sent when per-login CSRF state is off.
pub const FIXED_STATE: &str = "sessionID";

/// Login flow settings shared by the handlers.
#[derive(Debug, Clone)]
pub struct LoginFlow {
    oauth: Option<OAuthClient>,
    login_endpoint: String,
    csrf_state: bool,
}

impl LoginFlow {
    pub fn new(oauth: OAuthClient, login_endpoint: impl Into<String>, csrf_state: bool) -> Self {
        Self {
            oauth: Some(oauth),
            login_endpoint: login_endpoint.into(),
            csrf_state,
        }
    }

    /// Only the manual token endpoint works.
    pub fn without_oauth(login_endpoint: impl Into<String>) -> Self {
        Self {
            oauth: None,
            login_endpoint: login_endpoint.into(),
            csrf_state: false,
        }
    }

    fn oauth(&self) -> Result<&OAuthClient, GatewayError> {
        self.oauth.as_ref().ok_or(GatewayError::LoginNotConfigured)
    }

    fn failure(&self, reason: impl Into<String>) -> GatewayError {
        GatewayError::LoginExchangeFailed {
            login_endpoint: self.login_endpoint.clone(),
            reason: reason.into(),
        }
    }
}

fn random_state() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Login routes bound to their configured paths.
pub fn router(flow: Arc<LoginFlow>, server: &ServerConfig) -> Router {
    Router::new()
        .route(&server.login_path, get(start_login))
        .route(&server.callback_path, get(callback))
        .route(&server.token_path, get(token_get).post(token_post))
        .with_state(flow)
}

/// Clear any session and send the browser to the consent page.
pub async fn start_login(
    State(flow): State<Arc<LoginFlow>>,
    jar: CookieJar,
) -> Result<(CookieJar, Response), GatewayError> {
    let oauth = flow.oauth()?;

    let mut jar = jar.add(session_cookie(""));
    let state = if flow.csrf_state {
        let state = random_state();
        jar = jar.add(oauth_state_cookie(state.clone()));
        state
    } else {
        FIXED_STATE.to_string()
    };

    let url = oauth.authorization_url(&state);
    tracing::info!(csrf_state = flow.csrf_state, "Starting interactive login");
    metrics::record_login("oauth-start", "redirect");
    Ok((jar, found(url.as_str())?))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Finish the authorization-code flow.
pub async fn callback(
    State(flow): State<Arc<LoginFlow>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Response), GatewayError> {
    let oauth = flow.oauth()?;

    let result = async {
        if let Some(error) = params.error {
            return Err(flow.failure(format!("authorization server error {error:?}")));
        }

        if flow.csrf_state {
            let expected = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
            if expected.is_none() || expected.as_deref() != params.state.as_deref() {
                return Err(flow.failure("state mismatch"));
            }
        }

        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| flow.failure("missing code"))?;

        oauth
            .exchange(&code)
            .await
            .map_err(|e| flow.failure(e.to_string()))
    }
    .await;

    match result {
        Ok(access_token) => {
            tracing::info!("Interactive login succeeded");
            metrics::record_login("oauth-callback", "success");
            let mut jar = jar.add(session_cookie(access_token));
            if flow.csrf_state {
                jar = jar.add(clear_oauth_state_cookie());
            }
            Ok((jar, found("/")?))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Interactive login failed");
            metrics::record_login("oauth-callback", "failure");
            Err(e)
        }
    }
}

/// Manual token submission, from the query string or a form body.
#[derive(Debug, Default, Deserialize)]
pub struct ManualToken {
    #[serde(default)]
    token: String,
    #[serde(default)]
    then: String,
}

pub async fn token_get(
    jar: CookieJar,
    Query(params): Query<ManualToken>,
) -> Result<(CookieJar, Response), GatewayError> {
    accept_token(jar, params)
}

pub async fn token_post(
    jar: CookieJar,
    Form(params): Form<ManualToken>,
) -> Result<(CookieJar, Response), GatewayError> {
    accept_token(jar, params)
}

fn accept_token(jar: CookieJar, params: ManualToken) -> Result<(CookieJar, Response), GatewayError> {
    if params.token.is_empty() {
        metrics::record_login("manual", "failure");
        return Err(GatewayError::EmptyManualToken);
    }

    // `then` is followed as given.
    let then = if params.then.is_empty() { "/" } else { params.then.as_str() };
    let redirect = found(then).inspect_err(|_| metrics::record_login("manual", "failure"))?;
    metrics::record_login("manual", "success");
    Ok((jar.add(session_cookie(params.token.clone())), redirect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    fn manual_only() -> Router {
        router(
            Arc::new(LoginFlow::without_oauth("/auth/login")),
            &ServerConfig::default(),
        )
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn manual_token_via_query() {
        let response = manual_only()
            .oneshot(
                Request::get("/auth/token?token=abc&then=/dashboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/dashboard");
        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].starts_with("kube-auth-gateway-session-token=abc"));
        assert!(cookies[0].contains("HttpOnly"));
        assert!(cookies[0].contains("Path=/"));
    }

    #[tokio::test]
    async fn manual_token_via_form_defaults_to_root() {
        let response = manual_only()
            .oneshot(
                Request::post("/auth/token")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("token=xyz"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
        assert!(set_cookies(&response)[0].starts_with("kube-auth-gateway-session-token=xyz"));
    }

    #[tokio::test]
    async fn empty_manual_token_rejected() {
        let response = manual_only()
            .oneshot(Request::get("/auth/token?then=/x").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn unusable_then_target_rejected() {
        let response = manual_only()
            .oneshot(
                Request::get("/auth/token?token=abc&then=/x%0Ay")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::LOCATION).is_none());
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn oauth_routes_unavailable_without_client() {
        let response = manual_only()
            .oneshot(Request::get("/auth/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn random_state_is_hex() {
        let a = random_state();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, random_state());
    }
}

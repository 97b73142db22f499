//! Cookies written by the login flow.

use axum_extra::extract::cookie::{Cookie, SameSite};

pub use crate::auth::SESSION_COOKIE_NAME;

/// Holds the per-login OAuth state when CSRF state is enabled.
pub const OAUTH_STATE_COOKIE: &str = "kube-auth-gateway-oauth-state";

const OAUTH_STATE_MAX_AGE_SECS: i64 = 600;

fn base(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Session cookie carrying `token`. An empty token signs the caller out.
pub fn session_cookie(token: impl Into<String>) -> Cookie<'static> {
    base(SESSION_COOKIE_NAME, token.into())
}

pub fn oauth_state_cookie(state: impl Into<String>) -> Cookie<'static> {
    let mut cookie = base(OAUTH_STATE_COOKIE, state.into());
    cookie.set_max_age(time::Duration::seconds(OAUTH_STATE_MAX_AGE_SECS));
    cookie
}

pub fn clear_oauth_state_cookie() -> Cookie<'static> {
    let mut cookie = base(OAUTH_STATE_COOKIE, String::new());
    cookie.set_max_age(time::Duration::seconds(0));
    cookie
}

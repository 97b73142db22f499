//! Request-time errors and their HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::VerifyError;
use crate::http::response::{redirect_with_status, status_response, StatusBody};

/// Everything a request can fail with once the gateway is running.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No credential found and interactive login is off.
    #[error("no token received")]
    MissingCredential,

    /// Signature, structure, expiry or scope check failed.
    #[error("token validation failed")]
    VerificationFailed(#[source] VerifyError),

    /// Manual token submission without a token.
    #[error("token parameter is missing")]
    EmptyManualToken,

    /// Authorization-code exchange failed or was refused.
    #[error("authorization code exchange failed: {reason}")]
    LoginExchangeFailed {
        login_endpoint: String,
        reason: String,
    },

    /// A redirect target that cannot be sent as a `Location` header.
    #[error("redirect target is not a valid location")]
    InvalidRedirect(String),

    /// Start-login or callback hit without an OAuth client configured.
    #[error("interactive login is not configured")]
    LoginNotConfigured,

    /// Upstream could not be reached or the relay broke.
    #[error("upstream request failed: {0}")]
    UpstreamUnavailable(#[source] reqwest::Error),

    /// The outbound request could not be built.
    #[error("invalid upstream request: {0}")]
    UpstreamRequest(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingCredential | GatewayError::VerificationFailed(_) => {
                StatusCode::FORBIDDEN
            }
            GatewayError::EmptyManualToken | GatewayError::InvalidRedirect(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::LoginExchangeFailed { .. } => StatusCode::UNAUTHORIZED,
            GatewayError::LoginNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::UpstreamUnavailable(_) | GatewayError::UpstreamRequest(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            // A redirect that carries 401: browsers stop, scripts see the status.
            GatewayError::LoginExchangeFailed { login_endpoint, .. } => {
                match redirect_with_status(status, login_endpoint) {
                    Ok(redirect) => {
                        let (parts, _) = redirect.into_parts();
                        (parts, axum::Json(StatusBody::new(status, "login failed"))).into_response()
                    }
                    Err(e) => e.into_response(),
                }
            }
            GatewayError::UpstreamUnavailable(_) | GatewayError::UpstreamRequest(_) => {
                status_response(status, "upstream request failed")
            }
            _ => status_response(status, self.to_string()),
        }
    }
}

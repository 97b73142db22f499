//! Responses produced by the gateway itself.
//!
//! # Responsibilities
//! - Render the fixed `Status` JSON body used for every gateway-side failure
//! - Build redirects with exact status codes (302, 307, and 401 + Location)
//!
//! # Design Decisions
//! - The body shape never varies so scripted clients can always parse it
//! - Messages are generic; the precise failure only goes to the logs

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Value of the `api` field in every status body.
pub const GATEWAY_NAME: &str = "kube-auth-gateway";

/// Machine-parseable error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBody {
    pub kind: String,
    pub api: String,
    pub status: String,
    pub message: String,
    pub code: u16,
}

impl StatusBody {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        let reason = status.canonical_reason().unwrap_or("Unknown").replace(' ', "");
        Self {
            kind: "Status".to_string(),
            api: GATEWAY_NAME.to_string(),
            status: reason,
            message: message.into(),
            code: status.as_u16(),
        }
    }
}

/// A status body response with a matching HTTP status.
pub fn status_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(StatusBody::new(status, message))).into_response()
}

/// Redirect with an arbitrary status code. A location that cannot be carried
/// in a header is refused.
pub fn redirect_with_status(status: StatusCode, location: &str) -> Result<Response, GatewayError> {
    let value = HeaderValue::from_str(location)
        .map_err(|_| GatewayError::InvalidRedirect(location.to_string()))?;
    Ok((status, [(header::LOCATION, value)]).into_response())
}

/// 302 Found.
pub fn found(location: &str) -> Result<Response, GatewayError> {
    redirect_with_status(StatusCode::FOUND, location)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_body_shape() {
        let body = StatusBody::new(StatusCode::FORBIDDEN, "no token received");
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "kind": "Status",
                "api": GATEWAY_NAME,
                "status": "Forbidden",
                "message": "no token received",
                "code": 403
            })
        );
    }

    #[test]
    fn multi_word_reasons_are_joined() {
        assert_eq!(StatusBody::new(StatusCode::BAD_GATEWAY, "").status, "BadGateway");
        assert_eq!(StatusBody::new(StatusCode::BAD_REQUEST, "").status, "BadRequest");
    }

    #[test]
    fn status_response_sets_json_content_type() {
        let response = status_response(StatusCode::FORBIDDEN, "denied");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn redirect_keeps_exact_status() {
        let response = redirect_with_status(StatusCode::UNAUTHORIZED, "/auth/login").unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/auth/login");

        assert_eq!(found("/dash").unwrap().status(), StatusCode::FOUND);
    }

    #[test]
    fn unrepresentable_location_refused() {
        let err = found("/dash\nSet-Cookie: x=y").unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRedirect(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}

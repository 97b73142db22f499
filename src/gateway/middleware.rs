//! Axum middleware that applies the decision pipeline to every request.
//!
//! The pipeline only ever sees clean paths, so the path a token's scope is
//! checked against is the path forwarded upstream.

use std::borrow::Cow;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::VerifyError;
use crate::error::GatewayError;
use crate::gateway::path::clean_path;
use crate::gateway::pipeline::{Decision, RequestContext};
use crate::http::response::redirect_with_status;
use crate::http::server::AppState;
use crate::observability::metrics;

pub async fn gateway_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Cow::Owned(cleaned) = clean_path(req.uri().path()) {
        let location = match req.uri().query() {
            Some(query) => format!("{cleaned}?{query}"),
            None => cleaned,
        };
        tracing::debug!(path = %req.uri().path(), location = %location, "Redirecting to clean path");
        metrics::record_decision("redirect-clean-path");
        return redirect_with_status(StatusCode::MOVED_PERMANENTLY, &location)
            .unwrap_or_else(IntoResponse::into_response);
    }

    let decision = {
        let mut ctx = RequestContext::new(req.method(), req.uri().path(), req.headers());
        state.pipeline.evaluate(&mut ctx).decision
    };
    metrics::record_decision(decision.label());

    match decision {
        Decision::Forward(None) => next.run(req).await,
        Decision::Forward(Some(identity)) => match identity.header_value() {
            Some(value) => {
                req.headers_mut().insert(AUTHORIZATION, value);
                next.run(req).await
            }
            None => {
                tracing::warn!(identity = identity.kind(), "Credential is not a valid header value");
                GatewayError::VerificationFailed(VerifyError::Malformed(
                    "credential contains invalid header characters".to_string(),
                ))
                .into_response()
            }
        },
        Decision::Redirect(location) => {
            redirect_with_status(StatusCode::TEMPORARY_REDIRECT, &location)
                .unwrap_or_else(IntoResponse::into_response)
        }
        Decision::Deny(reason) => GatewayError::from(reason).into_response(),
    }
}

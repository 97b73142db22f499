//! Relays authorized API requests to the upstream server.
//!
//! # Responsibilities
//! - Map `<api_path><rest>` onto `<upstream base><rest>`, keeping the query
//! - Strip hop-by-hop headers in both directions and record the peer address
//! - Stream request and response bodies without buffering
//!
//! Upstream failures surface as 502 and are never retried.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::{Body, HttpBody},
    extract::ConnectInfo,
    http::{
        header::{self, HeaderName},
        HeaderMap, HeaderValue, Request, Response,
    },
};
use reqwest::Client;
use url::Url;

use crate::error::GatewayError;
use crate::observability::metrics;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove `api_prefix` (the api path without its trailing slash) from `path`.
///
/// `/k8s/api/v1/pods` becomes `/api/v1/pods`. A path outside the prefix is
/// returned unchanged.
pub fn rewrite_path<'a>(api_prefix: &str, path: &'a str) -> &'a str {
    match path.strip_prefix(api_prefix) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Drop hop-by-hop headers, including any named by `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, peer: SocketAddr) {
    let ip = peer.ip().to_string();
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) if !prior.is_empty() => format!("{prior}, {ip}"),
        _ => ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

#[derive(Debug, Clone)]
pub struct Forwarder {
    client: Client,
    upstream: Url,
    api_prefix: String,
}

impl Forwarder {
    pub fn new(client: Client, upstream: Url, api_path: &str) -> Self {
        Self {
            client,
            upstream,
            api_prefix: api_path.trim_end_matches('/').to_string(),
        }
    }

    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    /// Upstream URL for an incoming path and query.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> Url {
        let mut target = self.upstream.clone();
        let base = self.upstream.path().trim_end_matches('/');
        let rest = rewrite_path(&self.api_prefix, path);
        target.set_path(&format!("{base}{rest}"));
        target.set_query(query);
        target
    }

    pub async fn forward(&self, req: Request<Body>) -> Result<Response<Body>, GatewayError> {
        let start = Instant::now();
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let (parts, body) = req.into_parts();

        let path = parts.uri.path();
        let target = self.target_url(path, parts.uri.query());

        let mut headers = parts.headers.clone();
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        if let Some(peer) = peer {
            append_forwarded_for(&mut headers, peer);
        }

        let mut outbound = self
            .client
            .request(parts.method.clone(), target.clone())
            .headers(headers);
        if body.size_hint().exact() != Some(0) {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream_response = match outbound.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    method = %parts.method,
                    path = %path,
                    target = %target,
                    error = %e,
                    "Upstream request failed"
                );
                metrics::record_forward(parts.method.as_str(), 502, start);
                return Err(GatewayError::UpstreamUnavailable(e));
            }
        };

        let status = upstream_response.status();
        tracing::info!(
            method = %parts.method,
            path = %path,
            target = %target,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Forwarded request"
        );
        metrics::record_forward(parts.method.as_str(), status.as_u16(), start);

        let mut response_headers = upstream_response.headers().clone();
        strip_hop_by_hop(&mut response_headers);

        let mut response = Response::builder()
            .status(status)
            .body(Body::from_stream(upstream_response.bytes_stream()))
            .map_err(|e| GatewayError::UpstreamRequest(e.to_string()))?;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

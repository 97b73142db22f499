//! Shared utilities for gateway integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Form, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Deserialize;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use kube_auth_gateway::config::{GatewayConfig, OAuthConfig};
use kube_auth_gateway::HttpServer;

pub const SECRET: &[u8] = b"integration-secret";
pub const SERVICE_TOKEN: &str = "service-token";
pub const GOOD_CODE: &str = "good-code";
pub const IDP_ACCESS_TOKEN: &str = "idp-access-token";
pub const CLIENT_ID: &str = "gateway";
pub const CLIENT_SECRET: &str = "s3cret";

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Serve `router` on an ephemeral port.
pub async fn spawn(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

/// Upstream stand-in that echoes what it received as JSON.
pub struct EchoUpstream {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
}

impl EchoUpstream {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

async fn echo(
    State(hits): State<Arc<AtomicUsize>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    (
        StatusCode::OK,
        [("x-upstream", "echo")],
        Json(json!({
            "method": method.as_str(),
            "path": uri.path(),
            "query": uri.query(),
            "authorization": header("authorization"),
            "cookie": header("cookie"),
            "x_forwarded_for": header("x-forwarded-for"),
            "host": header("host"),
            "body": String::from_utf8_lossy(&body),
        })),
    )
}

pub async fn echo_upstream() -> EchoUpstream {
    echo_upstream_with(Router::new()).await
}

/// Echo upstream with extra routes (e.g. OAuth metadata) taking precedence.
pub async fn echo_upstream_with(extra: Router<Arc<AtomicUsize>>) -> EchoUpstream {
    let hits = Arc::new(AtomicUsize::new(0));
    let router = extra
        .fallback(echo)
        .with_state(Arc::clone(&hits));
    EchoUpstream {
        addr: spawn(router).await,
        hits,
    }
}

#[derive(Debug, Deserialize)]
struct TokenRequest {
    grant_type: String,
    code: String,
    redirect_uri: String,
}

async fn idp_token(headers: HeaderMap, Form(req): Form<TokenRequest>) -> impl IntoResponse {
    // "gateway:s3cret"
    let expected_auth = "Basic Z2F0ZXdheTpzM2NyZXQ=";
    let authorized = headers
        .get(header::AUTHORIZATION)
        .is_some_and(|v| v == expected_auth);

    if !authorized
        || req.grant_type != "authorization_code"
        || req.code != GOOD_CODE
        || !req.redirect_uri.ends_with("/auth/callback")
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "access_token": IDP_ACCESS_TOKEN,
            "token_type": "Bearer",
            "expires_in": 3600
        })),
    )
}

/// Token endpoint that answers only after the gateway should have given up.
async fn idp_slow_token(headers: HeaderMap, form: Form<TokenRequest>) -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(3)).await;
    idp_token(headers, form).await
}

/// Authorization server stand-in with `/oauth/authorize`, `/oauth/token` and
/// the stalling `/oauth/slow-token`.
pub async fn mock_idp() -> SocketAddr {
    let router = Router::new()
        .route("/oauth/authorize", get(|| async { "consent page" }))
        .route("/oauth/token", post(idp_token))
        .route("/oauth/slow-token", post(idp_slow_token));
    spawn(router).await
}

pub fn hs256(claims: Value) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET),
    )
    .unwrap()
}

pub fn rs256(private_key_fixture: &str, claims: Value) -> String {
    let pem = std::fs::read(fixture(private_key_fixture)).unwrap();
    encode(
        &Header::new(Algorithm::RS256),
        &claims,
        &EncodingKey::from_rsa_pem(&pem).unwrap(),
    )
    .unwrap()
}

pub fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Files the gateway needs on disk, kept alive for the test's duration.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        std::fs::create_dir(&public).unwrap();
        std::fs::write(public.join("login.html"), "<html>login</html>").unwrap();
        std::fs::write(public.join("index.html"), "<html>console</html>").unwrap();
        std::fs::write(dir.path().join("secret"), [SECRET, b"\n".as_slice()].concat()).unwrap();
        Self { dir }
    }

    /// Translate mode against `upstream`, HS256 verification, headless.
    pub fn config(&self, upstream: &str) -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.upstream.url = upstream.to_string();
        config.upstream.bearer_token = Some(SERVICE_TOKEN.to_string());
        config.auth.interactive = false;
        config.auth.jwt_secret_file = Some(self.dir.path().join("secret"));
        config.server.public_dir = self.dir.path().join("public");
        config
    }
}

pub fn oauth_config(idp: SocketAddr) -> OAuthConfig {
    OAuthConfig {
        client_id: CLIENT_ID.to_string(),
        client_secret: CLIENT_SECRET.to_string(),
        authorize_url: Some(format!("http://{idp}/oauth/authorize")),
        token_url: Some(format!("http://{idp}/oauth/token")),
        discover: false,
        ..OAuthConfig::default()
    }
}

/// Start the gateway and return its base URL.
pub async fn start_gateway(config: GatewayConfig) -> String {
    kube_auth_gateway::config::validation::validate_config(&config).unwrap();
    let server = HttpServer::from_config(config).await.unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        server
            .run(listener, std::future::pending::<()>())
            .await
            .unwrap();
    });
    format!("http://{addr}")
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Status and `Location` of a response read off a raw socket.
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub location: Option<String>,
}

/// GET `target` exactly as written; reqwest would resolve dot segments first.
pub async fn raw_get(gateway: &str, target: &str, token: &str) -> RawResponse {
    let addr = gateway.trim_start_matches("http://");
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {target} HTTP/1.1\r\nHost: {addr}\r\nAuthorization: Bearer {token}\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8_lossy(&raw);
    let (head, _) = raw.split_once("\r\n\r\n").unwrap();
    let mut lines = head.lines();

    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap()
        .parse()
        .unwrap();
    let location = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("location"))
        .map(|(_, value)| value.trim().to_string());
    RawResponse { status, location }
}

/// `Set-Cookie` headers of a response.
pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

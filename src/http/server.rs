//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: login routes, the API prefix and static files
//! - Put the decision middleware in front of everything except login routes
//! - Wire up request IDs and request tracing
//! - Serve over plain TCP or TLS with graceful shutdown

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    middleware::from_fn_with_state,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::{ConfigError, GatewayConfig};
use crate::error::GatewayError;
use crate::gateway::{gateway_middleware, Pipeline};
use crate::lifecycle::build_state;
use crate::login::{self, LoginFlow};
use crate::net::load_tls_config;
use crate::proxy::Forwarder;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub login: Arc<LoginFlow>,
    pub forwarder: Arc<Forwarder>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a server from already-built state.
    pub fn new(config: GatewayConfig, state: AppState) -> Self {
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Resolve keys, credentials and endpoints, then build the server.
    pub async fn from_config(config: GatewayConfig) -> Result<Self, ConfigError> {
        let state = build_state(&config).await?;
        Ok(Self::new(config, state))
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let api_route = format!("{}{{*path}}", config.upstream.api_path);
        let login_routes = login::router(Arc::clone(&state.login), &config.server);

        let gated = Router::new()
            .route(&api_route, any(forward_handler))
            .fallback_service(static_files(&config.server.public_dir))
            .layer(from_fn_with_state(state.clone(), gateway_middleware))
            .with_state(state);

        let request_id = HeaderName::from_static(X_REQUEST_ID);
        gated
            .merge(login_routes)
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
    }

    /// The router, for driving the gateway without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Serve plain HTTP on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` resolves.
    pub async fn run_tls<F>(self, addr: SocketAddr, shutdown: F) -> Result<(), ConfigError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Some(tls) = self.config.listener.tls.clone() else {
            return Err(ConfigError::Transport("listener.tls is not configured".to_string()));
        };
        let rustls = load_tls_config(&tls).await?;

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown.await;
            shutdown_handle.graceful_shutdown(None);
        });

        tracing::info!(address = %addr, "HTTPS server starting");
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(app)
            .await
            .map_err(|source| ConfigError::Io {
                path: tls.cert_path.clone(),
                source,
            })?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

fn static_files(public_dir: &Path) -> ServeDir {
    ServeDir::new(public_dir)
}

async fn forward_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    state.forwarder.forward(request).await
}

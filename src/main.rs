//! kube-auth-gateway
//!
//! An authenticating reverse proxy in front of a cluster API server.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                  AUTH GATEWAY                    │
//!                         │                                                  │
//!   Browser / script      │  ┌──────────┐   ┌──────────────────────────┐    │
//!   ──────────────────────┼─▶│  login   │   │  gateway middleware      │    │
//!    /auth/*              │  │  routes  │   │  login-page → credential │    │
//!                         │  └────┬─────┘   │  → pass-through |        │    │
//!   ──────────────────────┼───────┼────────▶│    protected → verify    │    │
//!    everything else      │       │         └──────┬───────────┬───────┘    │
//!                         │       ▼                ▼           ▼            │
//!                         │  ┌──────────┐   ┌───────────┐ ┌──────────┐      │
//!                         │  │  OAuth   │   │ forwarder │ │  static  │      │
//!                         │  │  server  │   │ (reqwest) │ │  files   │      │
//!                         │  └──────────┘   └─────┬─────┘ └──────────┘      │
//!                         └───────────────────────┼──────────────────────────┘
//!                                                 ▼
//!                                           API server
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use kube_auth_gateway::config::load_config;
use kube_auth_gateway::lifecycle::shutdown_signal;
use kube_auth_gateway::observability::{init_logging, metrics};
use kube_auth_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "kube-auth-gateway", version)]
#[command(about = "Authenticating reverse proxy for a cluster API server", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "KUBE_AUTH_GATEWAY_CONFIG", default_value = "gateway.toml")]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    if args.check {
        println!("{}: configuration is valid", args.config.display());
        return Ok(());
    }

    init_logging(&config.observability)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "kube-auth-gateway starting"
    );

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        api_path = %config.upstream.api_path,
        interactive = config.auth.interactive,
        passthrough = config.upstream.bearer_token_passthrough,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::from_config(config).await?;

    if server.config().listener.tls.is_some() {
        let addr: SocketAddr = server.config().listener.bind_address.parse()?;
        server.run_tls(addr, shutdown_signal()).await?;
    } else {
        let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
        server.run(listener, shutdown_signal()).await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

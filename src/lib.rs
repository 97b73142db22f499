//! Authenticating reverse proxy for a cluster API server.
//!
//! Callers present a bearer token (header or session cookie). The gateway
//! either forwards it unchanged or verifies it locally and swaps in its own
//! service credential, then relays the request to the upstream API.

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod login;
pub mod net;
pub mod observability;
pub mod proxy;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;

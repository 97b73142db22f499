//! Network layer subsystem.
//!
//! The gateway listens on plain TCP through `axum::serve`, or on TLS through
//! `axum-server` when a certificate is configured (tls.rs).

pub mod tls;

pub use tls::load_tls_config;

//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Authorized request (Authorization already rewritten by the gateway)
//!     → forwarder.rs (path rewrite, header hygiene, streaming relay)
//!     → transport.rs (reqwest client with upstream TLS settings)
//!     → API server
//! ```

pub mod forwarder;
pub mod transport;

pub use forwarder::{rewrite_path, Forwarder};
pub use transport::Transport;

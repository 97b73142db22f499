//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → keys, service credential, transport, OAuth discovery → AppState
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → graceful shutdown
//! ```
//!
//! Any startup error is fatal; traffic is only accepted once every component
//! has been built.

pub mod signals;
pub mod startup;

pub use signals::shutdown_signal;
pub use startup::build_state;

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! gateway, login, proxy
//!     → logging.rs (tracing events, pretty or JSON)
//!     → metrics.rs (Prometheus counters and histograms)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::init_logging;

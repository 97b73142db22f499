//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request IDs, tracing)
//!     → login routes, or the gateway middleware in front of the API
//!       prefix and static files
//!     → response.rs (status bodies and redirects produced locally)
//! ```

pub mod response;
pub mod server;

pub use response::{found, redirect_with_status, status_response, StatusBody, GATEWAY_NAME};
pub use server::{AppState, HttpServer, X_REQUEST_ID};

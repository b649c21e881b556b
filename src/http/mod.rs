//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout, body limit)
//!     → handlers.rs (parse JSON, build InboundCall)
//!     → pipeline (verify, quota, audit, scrub, upstream)
//!     → security headers → Send to client
//! ```

pub mod handlers;
pub mod server;

pub use server::{AppState, HttpServer};

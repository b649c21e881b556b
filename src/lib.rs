//! Secure AI gateway library.
//!
//! Every inference call passes credential verification, rate limiting,
//! redaction and auditing before it reaches an upstream provider.

pub mod audit;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod resilience;
pub mod security;
pub mod upstream;

pub use config::schema::GatewayConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
pub use pipeline::Pipeline;

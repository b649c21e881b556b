//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → consumed once at startup to build the pipeline
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{default_config, load_config, parse_config, uses_placeholder_secret, ConfigError};
pub use schema::AuditConfig;
pub use schema::AuthConfig;
pub use schema::BucketKey;
pub use schema::GatewayConfig;
pub use schema::ObservabilityConfig;
pub use schema::PolicyConfig;
pub use schema::RateLimitConfig;
pub use schema::UpstreamConfig;
pub use schema::UserAccount;

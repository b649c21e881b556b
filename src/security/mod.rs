//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → identity.rs (verify bearer credential)
//!     → rate_limit.rs (general class, then ai-call class)
//!     → redact.rs (scrub outbound payload and audit summaries)
//!     → headers.rs (hardening headers on the way out)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: reject on any security check failure
//! - No trust in client input

pub mod headers;
pub mod identity;
pub mod issuer;
pub mod rate_limit;
pub mod redact;

pub use identity::{Identity, IdentityVerifier, RejectReason};
pub use issuer::{CredentialIssuer, IssueError};
pub use rate_limit::{PolicySet, RateGovernor, RateLimitPolicy};

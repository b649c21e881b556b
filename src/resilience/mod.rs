//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream adapter:
//!     → timeouts.rs (enforce per-call deadline)
//!     → On expiry: AdapterError { kind: Timeout }
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Upstream calls are never retried

pub mod timeouts;

//! Request pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP handler
//!     → call.rs (InboundCall: method, path, headers, body, origin)
//!     → orchestrator.rs (verify → quota → audit open → scrub → upstream → audit close)
//!     → envelope.rs (success body + rate-limit headers)
//!     → error.rs (status mapping, generic 5xx body)
//! ```
//!
//! # Design Decisions
//! - Stage order is fixed; no stage can be skipped by a route
//! - Every audited request is closed exactly once, including failures
//! - Callers never see upstream error detail

pub mod call;
pub mod envelope;
pub mod error;
pub mod orchestrator;
pub mod route;

pub use call::InboundCall;
pub use envelope::{Metadata, PipelineSuccess, SuccessEnvelope};
pub use error::{Failure, PipelineError, INTERNAL_ERROR_MESSAGE};
pub use orchestrator::Pipeline;
pub use route::AiRoute;

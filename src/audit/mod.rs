//! Audit subsystem.
//!
//! # Data Flow
//! ```text
//! pipeline
//!     → recorder.rs open (scrub request, allocate correlation id)
//!     → ... gated stages and upstream call ...
//!     → recorder.rs close (scrub response, stamp finish)
//!     → sink.rs (tracing, JSON lines file, in-memory ring)
//! ```
//!
//! # Design Decisions
//! - Nothing unscrubbed ever lands in a record
//! - Exactly one emission per opened record
//! - Sink failures are warnings, not request failures

pub mod record;
pub mod recorder;
pub mod sink;

pub use record::AuditRecord;
pub use recorder::{AuditHandle, AuditRecorder};
pub use sink::{AuditSink, FanoutSink, JsonLinesSink, MemorySink, SinkError, TracingSink};

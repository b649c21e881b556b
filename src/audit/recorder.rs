//! Two-phase audit recording.
//!
//! `open` captures the scrubbed request and hands back an [`AuditHandle`].
//! `close` consumes the handle, so a record can be emitted at most once. A
//! handle dropped without `close` emits itself with status 499 on the
//! ambient runtime, so an abandoned request is still audited.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::record::{AuditRecord, STATUS_CLIENT_CLOSED};
use super::sink::AuditSink;
use crate::observability::metrics;
use crate::pipeline::InboundCall;
use crate::security::identity::Identity;
use crate::security::redact::{scrub, scrub_deep};

/// Builds audit records and hands them to a sink.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Start a record for `call`.
    pub fn open(&self, call: &InboundCall, identity: Option<&Identity>) -> AuditHandle {
        let record = AuditRecord {
            correlation_id: Uuid::new_v4(),
            identity_id: identity.map(|i| i.id.clone()),
            method: call.method.to_string(),
            path: call.path.clone(),
            origin: call.origin.clone(),
            user_agent: call.user_agent().map(scrub),
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: None,
            request_summary: scrub_deep(&call.body),
            response_summary: Value::Null,
            status_code: None,
            error_detail: None,
        };

        tracing::info!(
            target: "audit",
            correlation_id = %record.correlation_id,
            identity_id = ?record.identity_id,
            method = %record.method,
            path = %record.path,
            origin = %record.origin,
            request = %record.request_summary,
            "API request"
        );

        AuditHandle {
            record: Some(record),
            sink: self.sink.clone(),
            started: Instant::now(),
        }
    }

    /// Finish the record with the response and emit it.
    ///
    /// `response` and `error_detail` are scrubbed before they are stored.
    pub async fn close(
        &self,
        mut handle: AuditHandle,
        status: u16,
        response: &Value,
        error_detail: Option<&str>,
    ) {
        let Some(mut record) = handle.record.take() else {
            return;
        };
        complete(&mut record, handle.started, status, scrub_deep(response), error_detail);
        deliver(self.sink.as_ref(), &record).await;
    }
}

/// An open audit record.
pub struct AuditHandle {
    record: Option<AuditRecord>,
    sink: Arc<dyn AuditSink>,
    started: Instant,
}

impl AuditHandle {
    pub fn correlation_id(&self) -> Uuid {
        self.record
            .as_ref()
            .map(|r| r.correlation_id)
            .unwrap_or_default()
    }
}

impl Drop for AuditHandle {
    fn drop(&mut self) {
        let Some(mut record) = self.record.take() else {
            return;
        };
        complete(
            &mut record,
            self.started,
            STATUS_CLIENT_CLOSED,
            Value::Null,
            Some("request abandoned before completion"),
        );
        tracing::warn!(
            target: "audit",
            correlation_id = %record.correlation_id,
            "Audit handle dropped before close"
        );

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let sink = self.sink.clone();
                runtime.spawn(async move { deliver(sink.as_ref(), &record).await });
            }
            Err(_) => {
                tracing::error!(
                    target: "audit",
                    correlation_id = %record.correlation_id,
                    "No runtime available to emit abandoned audit record"
                );
                metrics::record_sink_failure("abandoned");
            }
        }
    }
}

fn complete(
    record: &mut AuditRecord,
    started: Instant,
    status: u16,
    response_summary: Value,
    error_detail: Option<&str>,
) {
    record.finished_at = Some(Utc::now());
    record.duration_ms = Some(started.elapsed().as_millis() as u64);
    record.status_code = Some(status);
    record.response_summary = response_summary;
    record.error_detail = error_detail.map(scrub);
}

async fn deliver(sink: &dyn AuditSink, record: &AuditRecord) {
    if let Err(e) = sink.emit(record).await {
        tracing::warn!(
            sink = sink.name(),
            correlation_id = %record.correlation_id,
            error = %e,
            "Audit emission failed"
        );
        metrics::record_sink_failure(sink.name());
    }
}

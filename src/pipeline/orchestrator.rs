//! The request pipeline.
//!
//! Fixed stage order for an inference call:
//!
//! ```text
//! verify credential → general quota → open audit
//!     → ai-call quota → validate → scrub payload → upstream (deadline)
//!     → close audit (every path) → envelope | Failure
//! ```
//!
//! Nothing reaches the adapter before the credential is verified and both
//! quotas admit the request, and nothing reaches it unscrubbed.

use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::task::JoinError;
use uuid::Uuid;

use super::call::InboundCall;
use super::envelope::{Metadata, PipelineSuccess, SuccessEnvelope};
use super::error::{Failure, PipelineError};
use super::route::AiRoute;
use crate::audit::AuditRecorder;
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;
use crate::security::identity::{Identity, IdentityVerifier};
use crate::security::rate_limit::{PolicySet, RateGovernor, RateLimitStatus};
use crate::security::redact::{detect, scrub_deep_tracked};
use crate::upstream::{AdapterError, UpstreamRequest, UpstreamResponse};

/// Wires the security components around an upstream adapter.
pub struct Pipeline {
    verifier: IdentityVerifier,
    governor: RateGovernor,
    recorder: AuditRecorder,
    policies: PolicySet,
    upstream_deadline: Duration,
}

/// Output of the stages that run while the audit record is open.
struct Gated {
    response: UpstreamResponse,
    scrubbed: bool,
    rate_limit: Option<RateLimitStatus>,
}

impl Pipeline {
    pub fn new(
        verifier: IdentityVerifier,
        governor: RateGovernor,
        recorder: AuditRecorder,
        policies: PolicySet,
        upstream_deadline: Duration,
    ) -> Self {
        Self {
            verifier,
            governor,
            recorder,
            policies,
            upstream_deadline,
        }
    }

    pub fn recorder(&self) -> &AuditRecorder {
        &self.recorder
    }

    /// Verify the caller and charge the general quota.
    ///
    /// Used directly by authenticated endpoints that do not call upstream.
    pub async fn authorize(&self, call: &InboundCall) -> Result<(Identity, Option<RateLimitStatus>), Failure> {
        let identity = self.verifier.verify(call.authorization(), &call.origin)?;
        let status = self
            .governor
            .admit_chain(&[&self.policies.general], Some(&identity), &call.origin)
            .await?;
        Ok((identity, status))
    }

    /// Charge the general quota for a caller with no credential.
    pub async fn admit_anonymous(&self, origin: &str) -> Result<Option<RateLimitStatus>, Failure> {
        Ok(self
            .governor
            .admit_chain(&[&self.policies.general], None, origin)
            .await?)
    }

    /// Run an inference call through every stage.
    pub async fn process(&self, call: InboundCall, route: &AiRoute) -> Result<PipelineSuccess, Failure> {
        let (identity, general) = self.authorize(&call).await?;

        let handle = self.recorder.open(&call, Some(&identity));
        let correlation_id = handle.correlation_id();

        let outcome = self.gated(&call, route, &identity, correlation_id).await;

        match outcome {
            Ok(gated) => {
                let envelope = SuccessEnvelope {
                    success: true,
                    data: gated.response,
                    metadata: Metadata {
                        scrubbed: gated.scrubbed,
                        correlation_id,
                    },
                };
                let body = serde_json::to_value(&envelope).unwrap_or(Value::Null);
                self.recorder.close(handle, 200, &body, None).await;

                Ok(PipelineSuccess {
                    envelope,
                    rate_limit: tighter(general, gated.rate_limit),
                })
            }
            Err(error) => {
                let body = json!({ "error": error.public_message() });
                let detail = error.detail();
                self.recorder
                    .close(handle, error.status().as_u16(), &body, detail.as_deref())
                    .await;

                Err(Failure {
                    error,
                    correlation_id: Some(correlation_id),
                })
            }
        }
    }

    async fn gated(
        &self,
        call: &InboundCall,
        route: &AiRoute,
        identity: &Identity,
        correlation_id: Uuid,
    ) -> Result<Gated, PipelineError> {
        let rate_limit = self
            .governor
            .admit_chain(&[&self.policies.ai_call], Some(identity), &call.origin)
            .await?;

        let request = route
            .build_request(call)
            .ok_or_else(|| PipelineError::Validation(route.missing_message.to_string()))?;

        let (payload, scrubbed) = scrub_deep_tracked(&request.payload);
        if scrubbed {
            metrics::record_redaction();
            let categories = request.payload.as_str().map(detect).unwrap_or_default();
            tracing::info!(
                target: "security",
                correlation_id = %correlation_id,
                identity_id = %identity.id,
                route = route.name,
                categories = ?categories,
                "Sensitive data redacted from upstream payload"
            );
        }
        let request = UpstreamRequest { payload, ..request };

        let provider = route.adapter.provider().to_string();
        let start = Instant::now();
        let result = self.call_upstream(route, request).await;
        metrics::record_upstream_call(&provider, start);

        let response = match result {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!(
                    correlation_id = %correlation_id,
                    provider = %provider,
                    error = %e,
                    "Upstream adapter panicked"
                );
                return Err(PipelineError::Internal(format!("upstream adapter failed: {e}")));
            }
            Err(e) => {
                tracing::error!(
                    correlation_id = %correlation_id,
                    provider = %provider,
                    kind = ?e.kind,
                    error = %e.message,
                    "Upstream call failed"
                );
                return Err(PipelineError::UpstreamFailure(e));
            }
        };

        Ok(Gated {
            response,
            scrubbed,
            rate_limit,
        })
    }

    /// Call the adapter in its own task under the upstream deadline.
    ///
    /// A panicking adapter surfaces as a `JoinError` instead of unwinding
    /// through the open audit record. The task is aborted on expiry.
    async fn call_upstream(
        &self,
        route: &AiRoute,
        request: UpstreamRequest,
    ) -> Result<Result<UpstreamResponse, JoinError>, AdapterError> {
        let adapter = route.adapter.clone();
        let task = tokio::spawn(async move { adapter.call(request).await });
        let abort = task.abort_handle();

        let result = with_deadline(self.upstream_deadline, async move {
            match task.await {
                Ok(result) => result.map(Ok),
                Err(e) => Ok(Err(e)),
            }
        })
        .await;

        if result.is_err() {
            abort.abort();
        }
        result
    }
}

fn tighter(a: Option<RateLimitStatus>, b: Option<RateLimitStatus>) -> Option<RateLimitStatus> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b.remaining < a.remaining { b } else { a }),
        (a, b) => a.or(b),
    }
}

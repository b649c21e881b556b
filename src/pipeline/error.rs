//! Pipeline error taxonomy and its HTTP mapping.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::security::identity::RejectReason;
use crate::security::rate_limit::Denial;
use crate::upstream::AdapterError;

/// Message returned for every 5xx; detail stays in logs and the audit trail.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Why the pipeline refused or failed a request.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Access token required")]
    AuthMissing,

    #[error("Invalid or expired token ({0})")]
    AuthInvalid(RejectReason),

    #[error("Insufficient role")]
    Forbidden,

    #[error("{message} (policy {policy})")]
    RateLimited {
        policy: String,
        message: String,
        retry_after: Duration,
    },

    #[error("{0}")]
    Validation(String),

    #[error("Upstream failure: {0}")]
    UpstreamFailure(AdapterError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::AuthMissing => StatusCode::UNAUTHORIZED,
            PipelineError::AuthInvalid(_) | PipelineError::Forbidden => StatusCode::FORBIDDEN,
            PipelineError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::UpstreamFailure(_) | PipelineError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message a caller is allowed to see.
    pub fn public_message(&self) -> String {
        match self {
            PipelineError::AuthMissing => "Access token required".to_string(),
            PipelineError::AuthInvalid(_) => "Invalid or expired token".to_string(),
            PipelineError::Forbidden => "Insufficient role".to_string(),
            PipelineError::RateLimited { message, .. } => message.clone(),
            PipelineError::Validation(message) => message.clone(),
            PipelineError::UpstreamFailure(_) | PipelineError::Internal(_) => {
                INTERNAL_ERROR_MESSAGE.to_string()
            }
        }
    }

    /// Internal detail worth keeping in the audit trail.
    pub fn detail(&self) -> Option<String> {
        match self {
            PipelineError::UpstreamFailure(e) => Some(e.to_string()),
            PipelineError::Internal(detail) => Some(detail.clone()),
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            PipelineError::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

impl From<RejectReason> for PipelineError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::MissingCredential => PipelineError::AuthMissing,
            other => PipelineError::AuthInvalid(other),
        }
    }
}

impl From<Denial> for PipelineError {
    fn from(denial: Denial) -> Self {
        PipelineError::RateLimited {
            policy: denial.policy,
            message: denial.message,
            retry_after: denial.retry_after,
        }
    }
}

/// A pipeline error, tagged with the correlation id once auditing began.
#[derive(Debug, Clone)]
pub struct Failure {
    pub error: PipelineError,
    pub correlation_id: Option<Uuid>,
}

impl Failure {
    pub fn new(error: PipelineError) -> Self {
        Self {
            error,
            correlation_id: None,
        }
    }
}

impl From<PipelineError> for Failure {
    fn from(error: PipelineError) -> Self {
        Self::new(error)
    }
}

impl From<RejectReason> for Failure {
    fn from(reason: RejectReason) -> Self {
        Self::new(reason.into())
    }
}

impl From<Denial> for Failure {
    fn from(denial: Denial) -> Self {
        Self::new(denial.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(rename = "correlationId", skip_serializing_if = "Option::is_none")]
    correlation_id: Option<Uuid>,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

/// Whole seconds, rounded up.
pub(crate) fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let retry_after = self.error.retry_after().map(ceil_secs);
        let body = ErrorBody {
            error: self.error.public_message(),
            correlation_id: self.correlation_id,
            retry_after,
        };

        let mut response = (self.error.status(), Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::AdapterErrorKind;

    #[test]
    fn test_status_mapping() {
        assert_eq!(PipelineError::AuthMissing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            PipelineError::from(RejectReason::Expired).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            PipelineError::Validation("Prompt is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_missing_credential_maps_to_auth_missing() {
        assert!(matches!(
            PipelineError::from(RejectReason::MissingCredential),
            PipelineError::AuthMissing
        ));
        assert!(matches!(
            PipelineError::from(RejectReason::InvalidSignature),
            PipelineError::AuthInvalid(RejectReason::InvalidSignature)
        ));
    }

    #[test]
    fn test_upstream_detail_not_public() {
        let error = PipelineError::UpstreamFailure(AdapterError::new(
            AdapterErrorKind::Unavailable,
            "connection refused to 10.0.0.7",
        ));
        assert_eq!(error.public_message(), INTERNAL_ERROR_MESSAGE);
        assert!(error.detail().unwrap().contains("10.0.0.7"));
    }

    #[test]
    fn test_rate_limited_response_carries_retry_after() {
        let failure = Failure::from(Denial {
            policy: "ai-call".into(),
            message: "AI request limit exceeded, please slow down".into(),
            retry_after: Duration::from_millis(41_200),
        });
        let response = failure.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}

//! Success envelope returned to callers.

use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ceil_secs;
use crate::security::rate_limit::RateLimitStatus;
use crate::upstream::UpstreamResponse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Whether the redactor changed the payload sent upstream.
    pub scrubbed: bool,
    #[serde(rename = "correlationId")]
    pub correlation_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessEnvelope {
    pub success: bool,
    pub data: UpstreamResponse,
    pub metadata: Metadata,
}

/// A completed pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSuccess {
    pub envelope: SuccessEnvelope,
    /// Tightest quota among the policies that admitted the request.
    pub rate_limit: Option<RateLimitStatus>,
}

impl IntoResponse for PipelineSuccess {
    fn into_response(self) -> Response {
        let mut response = Json(self.envelope).into_response();
        if let Some(status) = self.rate_limit {
            let headers = response.headers_mut();
            headers.insert(
                HeaderName::from_static("ratelimit-limit"),
                HeaderValue::from(status.limit),
            );
            headers.insert(
                HeaderName::from_static("ratelimit-remaining"),
                HeaderValue::from(status.remaining),
            );
            headers.insert(
                HeaderName::from_static("ratelimit-reset"),
                HeaderValue::from(ceil_secs(status.reset_after)),
            );
        }
        response
    }
}

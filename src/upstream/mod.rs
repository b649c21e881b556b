//! Upstream adapter interface.
//!
//! # Data Flow
//! ```text
//! pipeline (scrubbed UpstreamRequest)
//!     → UpstreamAdapter::call (provider-specific, pluggable)
//!     → UpstreamResponse | AdapterError
//!     → pipeline (envelope / generic 500)
//! ```
//!
//! # Design Decisions
//! - The pipeline only ever sees the provider-agnostic envelope
//! - Adapter error detail is for logs and the audit trail, never callers

pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use mock::{MockChatAdapter, MockClassifierAdapter};

/// Provider-agnostic request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamRequest {
    /// Already-scrubbed text or structured payload.
    pub payload: Value,
    pub model: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Provider-agnostic response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamResponse {
    pub payload: Value,
    #[serde(rename = "usageStats", skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageStats>,
    #[serde(rename = "providerStatus")]
    pub provider_status: String,
}

/// Category of adapter failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterErrorKind {
    Unavailable,
    Timeout,
    Rejected,
    InvalidResponse,
}

/// An upstream call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?}: {message}")]
pub struct AdapterError {
    pub kind: AdapterErrorKind,
    pub message: String,
}

impl AdapterError {
    pub fn new(kind: AdapterErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A provider integration.
#[async_trait]
pub trait UpstreamAdapter: Send + Sync {
    /// Short provider name for logs and metrics.
    fn provider(&self) -> &str;

    async fn call(&self, request: UpstreamRequest) -> Result<UpstreamResponse, AdapterError>;
}

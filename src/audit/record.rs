//! The audit record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Status recorded when a request is abandoned before it completes.
pub const STATUS_CLIENT_CLOSED: u16 = 499;

/// A correlated, scrubbed account of one request and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub correlation_id: Uuid,
    pub identity_id: Option<String>,
    pub method: String,
    pub path: String,
    pub origin: String,
    pub user_agent: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub request_summary: Value,
    pub response_summary: Value,
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl AuditRecord {
    /// Whether the post-call phase has been filled in.
    pub fn is_complete(&self) -> bool {
        self.finished_at.is_some() && self.status_code.is_some()
    }
}

//! Inbound call envelope.

use axum::http::{header, HeaderMap, Method};
use serde_json::Value;

/// Everything the pipeline needs from an inbound API call.
#[derive(Debug, Clone)]
pub struct InboundCall {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
    /// Network origin of the caller, used as the rate-limit fallback key.
    pub origin: String,
}

impl InboundCall {
    pub fn new(method: Method, path: impl Into<String>, body: Value) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body,
            origin: "unknown".to_string(),
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_bearer(mut self, token: &str) -> Self {
        if let Ok(value) = format!("Bearer {token}").parse() {
            self.headers.insert(header::AUTHORIZATION, value);
        }
        self
    }

    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
    }

    /// A string field of the JSON body, if present and non-empty.
    pub fn body_str(&self, field: &str) -> Option<&str> {
        self.body
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

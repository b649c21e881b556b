//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ai_gateway::config::{default_config, GatewayConfig};
use ai_gateway::security::{CredentialIssuer, Identity};
use ai_gateway::upstream::{
    AdapterError, AdapterErrorKind, UpstreamAdapter, UpstreamRequest, UpstreamResponse,
};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use serde_json::{json, Value};

pub const SECRET: &str = "integration-test-secret";

/// Defaults with a known signing secret and no console audit noise.
pub fn test_config() -> GatewayConfig {
    let mut config = default_config().unwrap();
    config.auth.jwt_secret = SECRET.to_string();
    config.audit.log_events = false;
    config
}

/// How a [`RecordingAdapter`] answers.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Echo,
    Fail,
    Panic,
    Stall(Duration),
}

/// Adapter that remembers every payload it was sent.
pub struct RecordingAdapter {
    behavior: Behavior,
    calls: AtomicUsize,
    payloads: Mutex<Vec<Value>>,
}

impl RecordingAdapter {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamAdapter for RecordingAdapter {
    fn provider(&self) -> &str {
        "recording"
    }

    async fn call(&self, request: UpstreamRequest) -> Result<UpstreamResponse, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(request.payload.clone());

        match self.behavior {
            Behavior::Echo => Ok(UpstreamResponse {
                payload: json!({ "echo": request.payload, "model": request.model }),
                usage: None,
                provider_status: "ok".into(),
            }),
            Behavior::Fail => Err(AdapterError::new(
                AdapterErrorKind::Unavailable,
                "connection refused by provider.internal:8443",
            )),
            Behavior::Panic => panic!("provider client crashed"),
            Behavior::Stall(delay) => {
                tokio::time::sleep(delay).await;
                Err(AdapterError::new(AdapterErrorKind::InvalidResponse, "stalled"))
            }
        }
    }
}

/// A signed credential for `role`, valid for an hour.
pub fn token_for(id: &str, role: &str) -> String {
    let identity = Identity {
        id: id.to_string(),
        principal_name: id.to_string(),
        role: role.to_string(),
    };
    CredentialIssuer::new(SECRET, 3600, Vec::new())
        .issue_at(&identity, chrono::Utc::now(), chrono::Duration::hours(1))
        .unwrap()
}

pub fn post_json(path: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

//! Simulated provider adapters.
//!
//! Stand-ins for a chat-completion provider and a text-classification
//! provider. They shape their responses like the real services and can add
//! artificial latency, but never leave the process.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{AdapterError, UpstreamAdapter, UpstreamRequest, UpstreamResponse, UsageStats};

/// Characters of the prompt echoed back in a mock completion.
const ECHO_CHARS: usize = 50;

fn payload_text(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Chat-completion shaped mock.
#[derive(Debug, Clone, Default)]
pub struct MockChatAdapter {
    latency: Duration,
}

impl MockChatAdapter {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl UpstreamAdapter for MockChatAdapter {
    fn provider(&self) -> &str {
        "openai"
    }

    async fn call(&self, request: UpstreamRequest) -> Result<UpstreamResponse, AdapterError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let prompt = payload_text(&request.payload);
        let excerpt: String = prompt.chars().take(ECHO_CHARS).collect();
        let prompt_tokens = (prompt.chars().count() as u64).div_ceil(4);
        let completion_tokens = 20;

        let payload = json!({
            "id": format!("chatcmpl-{}", Uuid::new_v4()),
            "object": "chat.completion",
            "created": Utc::now().timestamp(),
            "model": request.model,
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": format!("Mock response to: \"{excerpt}...\""),
                },
                "finish_reason": "stop",
            }],
        });

        Ok(UpstreamResponse {
            payload,
            usage: Some(UsageStats {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
            provider_status: "ok".to_string(),
        })
    }
}

/// Sentiment-classifier shaped mock.
#[derive(Debug, Clone, Default)]
pub struct MockClassifierAdapter {
    latency: Duration,
}

impl MockClassifierAdapter {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl UpstreamAdapter for MockClassifierAdapter {
    fn provider(&self) -> &str {
        "huggingface"
    }

    async fn call(&self, request: UpstreamRequest) -> Result<UpstreamResponse, AdapterError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let text = payload_text(&request.payload);
        let payload = json!({
            "model": request.model,
            "predictions": [{ "label": "POSITIVE", "score": 0.9998 }],
            "processed_text": text,
        });

        Ok(UpstreamResponse {
            payload,
            usage: None,
            provider_status: "ok".to_string(),
        })
    }
}

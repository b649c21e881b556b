//! Inference endpoint descriptors.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::call::InboundCall;
use crate::config::UpstreamConfig;
use crate::upstream::{UpstreamAdapter, UpstreamRequest};

/// How an inference endpoint maps a request body onto an upstream call.
#[derive(Clone)]
pub struct AiRoute {
    /// Route label for logs and metrics.
    pub name: &'static str,
    /// Body field holding the text sent upstream.
    pub input_field: &'static str,
    /// Validation message when `input_field` is absent or empty.
    pub missing_message: &'static str,
    pub default_model: String,
    /// Params forwarded upstream; the body's value wins over the default.
    pub param_defaults: Map<String, Value>,
    pub adapter: Arc<dyn UpstreamAdapter>,
}

impl AiRoute {
    pub fn chat(config: &UpstreamConfig, adapter: Arc<dyn UpstreamAdapter>) -> Self {
        let mut param_defaults = Map::new();
        param_defaults.insert("max_tokens".into(), Value::from(config.max_tokens));
        Self {
            name: "openai.chat",
            input_field: "prompt",
            missing_message: "Prompt is required",
            default_model: config.chat_model.clone(),
            param_defaults,
            adapter,
        }
    }

    pub fn analyze(config: &UpstreamConfig, adapter: Arc<dyn UpstreamAdapter>) -> Self {
        Self {
            name: "huggingface.analyze",
            input_field: "text",
            missing_message: "Text is required",
            default_model: config.classifier_model.clone(),
            param_defaults: Map::new(),
            adapter,
        }
    }

    /// Build the unscrubbed upstream request, or `None` if the input is missing.
    pub fn build_request(&self, call: &InboundCall) -> Option<UpstreamRequest> {
        let input = call.body_str(self.input_field)?;
        let model = call.body_str("model").unwrap_or(&self.default_model).to_string();

        let params = self
            .param_defaults
            .iter()
            .map(|(key, default)| {
                let value = call
                    .body
                    .get(key)
                    .filter(|v| !v.is_null())
                    .unwrap_or(default)
                    .clone();
                (key.clone(), value)
            })
            .collect();

        Some(UpstreamRequest {
            payload: Value::String(input.to_string()),
            model,
            params,
        })
    }
}

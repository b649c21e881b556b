use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("gateway returned {status}: {message}")]
    Api {
        status: StatusCode,
        message: String,
        correlation_id: Option<String>,
        retry_after: Option<Duration>,
    },

    #[error("not logged in")]
    NotLoggedIn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: LoginUser,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

pub struct GatewayClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Log in and keep the returned token for later calls.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let resp = self
            .client
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;

        let login: LoginResponse = check(resp).await?.json().await?;
        self.token = Some(login.token.clone());
        Ok(login)
    }

    /// Send a prompt; returns the full success envelope.
    pub async fn chat(
        &self,
        prompt: &str,
        model: Option<&str>,
        max_tokens: Option<u64>,
    ) -> Result<Value, ClientError> {
        let req = self
            .authed(self.client.post(format!("{}/api/openai/chat", self.base_url)))?
            .json(&ChatRequest {
                prompt,
                model,
                max_tokens,
            });
        Ok(check(req.send().await?).await?.json().await?)
    }

    /// Classify text; returns the full success envelope.
    pub async fn analyze(&self, text: &str, model: Option<&str>) -> Result<Value, ClientError> {
        let req = self
            .authed(self.client.post(format!("{}/api/huggingface/analyze", self.base_url)))?
            .json(&AnalyzeRequest { text, model });
        Ok(check(req.send().await?).await?.json().await?)
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    fn authed(&self, req: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NotLoggedIn)?;
        Ok(req.bearer_auth(token))
    }
}

/// Turn a non-success response into `ClientError::Api`.
async fn check(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let retry_after = resp
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs);

    let body: Value = resp.json().await.unwrap_or(Value::Null);
    Err(ClientError::Api {
        status,
        message: body["error"].as_str().unwrap_or_default().to_string(),
        correlation_id: body["correlationId"].as_str().map(str::to_string),
        retry_after,
    })
}

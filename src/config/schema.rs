//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Credential verification and the demo login collaborator.
    pub auth: AuthConfig,

    /// Rate limiting policy classes.
    pub rate_limit: RateLimitConfig,

    /// Audit trail settings.
    pub audit: AuditConfig,

    /// Upstream adapter defaults.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Security hardening settings.
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Deadline for a single upstream adapter call in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 20,
        }
    }
}

/// Credential settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret used to sign and verify credentials.
    /// Overridden by the `JWT_SECRET` environment variable.
    pub jwt_secret: String,

    /// Lifetime of issued credentials in seconds.
    pub token_ttl_secs: u64,

    /// Accounts accepted by the login endpoint.
    pub users: Vec<UserAccount>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            jwt_secret: "your-secret-key".to_string(),
            token_ttl_secs: 24 * 60 * 60,
            users: vec![UserAccount::default()],
        }
    }
}

/// A login account for the demo login collaborator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserAccount {
    /// Identity id embedded in issued credentials.
    pub id: String,

    /// Login name.
    pub username: String,

    /// Plaintext demo password.
    pub password: String,

    /// Role embedded in issued credentials ("user", "admin").
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "user".to_string()
}

impl Default for UserAccount {
    fn default() -> Self {
        Self {
            id: "user123".to_string(),
            username: "demo".to_string(),
            password: "password123".to_string(),
            role: default_role(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Broad class applied to every API call.
    pub general: PolicyConfig,

    /// Narrow class applied to inference endpoints only.
    pub ai_call: PolicyConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            general: PolicyConfig {
                window_secs: 15 * 60,
                max_requests: 100,
                message: "Too many requests, please try again later".to_string(),
                key: BucketKey::default(),
            },
            ai_call: PolicyConfig {
                window_secs: 60,
                max_requests: 10,
                message: "AI request limit exceeded, please slow down".to_string(),
                key: BucketKey::default(),
            },
        }
    }
}

/// A single fixed-window policy class.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyConfig {
    /// Window length in seconds.
    pub window_secs: u64,

    /// Requests admitted per key per window.
    pub max_requests: u32,

    /// Message returned to callers on denial.
    pub message: String,

    /// What the counter is keyed on.
    #[serde(default)]
    pub key: BucketKey,
}

/// How a policy derives its bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketKey {
    /// Identity id when authenticated, otherwise the network origin.
    #[default]
    IdentityOrOrigin,
    /// Always the network origin.
    Origin,
}

/// Audit trail configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Emit completed records as structured tracing events.
    pub log_events: bool,

    /// Optional JSON-lines file records are appended to.
    pub log_file: Option<String>,

    /// Number of recent records kept in memory for the admin endpoint.
    pub recent_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_events: true,
            log_file: None,
            recent_capacity: 1000,
        }
    }
}

/// Defaults applied when building upstream requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Model used by the chat endpoint when the caller names none.
    pub chat_model: String,

    /// Completion token cap used when the caller names none.
    pub max_tokens: u64,

    /// Model used by the analyze endpoint when the caller names none.
    pub classifier_model: String,

    /// Artificial latency of the mock adapters in milliseconds.
    pub simulated_latency_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            chat_model: "gpt-3.5-turbo".to_string(),
            max_tokens: 150,
            classifier_model: "distilbert-base-uncased".to_string(),
            simulated_latency_ms: 0,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("json" or "pretty").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

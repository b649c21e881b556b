//! Route handlers.
//!
//! Handlers only translate between HTTP and the pipeline: every security
//! decision happens in [`Pipeline`](crate::pipeline::Pipeline).

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use super::server::AppState;
use crate::observability::metrics;
use crate::pipeline::{AiRoute, Failure, InboundCall, PipelineError};
use crate::security::IssueError;

/// Default number of records returned by the audit endpoint.
const DEFAULT_AUDIT_LIMIT: usize = 50;

/// Network origin of the caller.
///
/// Falls back to `"unknown"` when the server was not started with connect
/// info, as in router-level tests.
pub struct ClientOrigin(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientOrigin {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let origin = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(Self(origin))
    }
}

/// Parse a JSON body; an empty body is an empty object.
fn parse_body(bytes: &Bytes) -> Result<Value, Response> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(bytes).map_err(|e| {
        tracing::debug!(error = %e, "Rejected malformed JSON body");
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid JSON body" })),
        )
            .into_response()
    })
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn login(
    State(state): State<AppState>,
    ClientOrigin(origin): ClientOrigin,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let response = login_inner(&state, &origin, &body).await;
    metrics::record_request("auth.login", response.status().as_u16(), start);
    response
}

async fn login_inner(state: &AppState, origin: &str, body: &Bytes) -> Response {
    let body = match parse_body(body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    if let Err(failure) = state.pipeline.admit_anonymous(origin).await {
        return failure.into_response();
    }

    let username = body.get("username").and_then(Value::as_str).unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();

    match state.issuer.login(username, password) {
        Ok(issued) => {
            tracing::info!(target: "security", username = %username, "User login successful");
            Json(json!({
                "success": true,
                "token": issued.token,
                "expiresAt": issued.expires_at.to_rfc3339(),
                "user": {
                    "id": issued.identity.id,
                    "username": issued.identity.principal_name,
                },
            }))
            .into_response()
        }
        Err(IssueError::InvalidCredentials) => {
            tracing::warn!(
                target: "security",
                username = %username,
                origin = %origin,
                "Failed login attempt"
            );
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid credentials" })),
            )
                .into_response()
        }
        Err(e) => Failure::new(PipelineError::Internal(e.to_string())).into_response(),
    }
}

pub async fn chat(
    State(state): State<AppState>,
    ClientOrigin(origin): ClientOrigin,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let route = state.chat.clone();
    infer(state, route, origin, method, uri, headers, body).await
}

pub async fn analyze(
    State(state): State<AppState>,
    ClientOrigin(origin): ClientOrigin,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let route = state.analyze.clone();
    infer(state, route, origin, method, uri, headers, body).await
}

/// Run an inference route through the pipeline.
///
/// The pipeline runs in its own task: if the client goes away, the task
/// still finishes and the audit record is closed with the real outcome.
async fn infer(
    state: AppState,
    route: AiRoute,
    origin: String,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let name = route.name;

    let body = match parse_body(&body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let call = InboundCall {
        method,
        path: uri.path().to_string(),
        headers,
        body,
        origin,
    };

    let pipeline = state.pipeline.clone();
    let task = tokio::spawn(async move { pipeline.process(call, &route).await });

    let response = match task.await {
        Ok(Ok(success)) => success.into_response(),
        Ok(Err(failure)) => failure.into_response(),
        Err(e) => {
            tracing::error!(route = name, error = %e, "Pipeline task failed");
            Failure::new(PipelineError::Internal(e.to_string())).into_response()
        }
    };

    metrics::record_request(name, response.status().as_u16(), start);
    response
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    limit: Option<usize>,
}

/// Recent audit records, newest first. Admin only.
pub async fn admin_audit(
    State(state): State<AppState>,
    ClientOrigin(origin): ClientOrigin,
    headers: HeaderMap,
    Query(query): Query<AuditQuery>,
) -> Response {
    let start = Instant::now();
    let mut call = InboundCall::new(Method::GET, "/api/admin/audit", Value::Null).with_origin(origin);
    call.headers = headers;

    let response = match state.pipeline.authorize(&call).await {
        Ok((identity, _)) if identity.is_admin() => {
            let records = state
                .audit_log
                .recent(query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT));
            Json(json!({ "count": records.len(), "records": records })).into_response()
        }
        Ok((identity, _)) => {
            tracing::warn!(
                target: "security",
                identity_id = %identity.id,
                role = %identity.role,
                "Audit log access denied"
            );
            Failure::new(PipelineError::Forbidden).into_response()
        }
        Err(failure) => failure.into_response(),
    };

    metrics::record_request("admin.audit", response.status().as_u16(), start);
    response
}

pub async fn not_found(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "path": uri.path(),
        })),
    )
        .into_response()
}

//! Router-level tests: every request goes through the full middleware stack.

use std::sync::Arc;
use std::time::Duration;

use ai_gateway::config::GatewayConfig;
use ai_gateway::{AppState, HttpServer};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{Behavior, RecordingAdapter};

fn server_with(config: &GatewayConfig, adapter: Arc<RecordingAdapter>) -> HttpServer {
    let state = AppState::new(config, adapter.clone(), adapter);
    HttpServer::with_state(config, state)
}

#[tokio::test]
async fn test_email_redacted_end_to_end() {
    let adapter = RecordingAdapter::new(Behavior::Echo);
    let server = server_with(&common::test_config(), adapter.clone());
    let token = common::token_for("user123", "user");

    let response = server
        .router()
        .oneshot(common::post_json(
            "/api/openai/chat",
            Some(&token),
            &json!({ "prompt": "my email is a@b.com" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["metadata"]["scrubbed"], true);
    assert!(body["metadata"]["correlationId"].is_string());
    assert_eq!(adapter.payloads(), vec![json!("my email is [EMAIL_REDACTED]")]);

    let records = server.state().audit_log.recent(10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status_code, Some(200));
    assert!(!serde_json::to_string(&records[0]).unwrap().contains("a@b.com"));
}

#[tokio::test]
async fn test_clean_prompt_not_marked_scrubbed() {
    let adapter = RecordingAdapter::new(Behavior::Echo);
    let server = server_with(&common::test_config(), adapter.clone());
    let token = common::token_for("user123", "user");

    let response = server
        .router()
        .oneshot(common::post_json(
            "/api/openai/chat",
            Some(&token),
            &json!({ "prompt": "what is a monad?", "model": "gpt-4" }),
        ))
        .await
        .unwrap();

    let body = common::json_body(response).await;
    assert_eq!(body["metadata"]["scrubbed"], false);
    assert_eq!(body["data"]["payload"]["model"], "gpt-4");
}

#[tokio::test]
async fn test_ai_quota_allows_ten_of_fifteen() {
    let adapter = RecordingAdapter::new(Behavior::Echo);
    let server = server_with(&common::test_config(), adapter.clone());
    let router = server.router();
    let token = common::token_for("user123", "user");

    let mut ok = 0;
    let mut limited = 0;
    for i in 0..15 {
        let response = router
            .clone()
            .oneshot(common::post_json(
                "/api/openai/chat",
                Some(&token),
                &json!({ "prompt": format!("Test request {}", i + 1) }),
            ))
            .await
            .unwrap();

        match response.status() {
            StatusCode::OK => {
                if ok == 0 {
                    assert_eq!(response.headers()["ratelimit-limit"], "10");
                    assert_eq!(response.headers()["ratelimit-remaining"], "9");
                }
                ok += 1;
            }
            StatusCode::TOO_MANY_REQUESTS => {
                assert!(response.headers().contains_key(header::RETRY_AFTER));
                let body = common::json_body(response).await;
                assert_eq!(body["error"], "AI request limit exceeded, please slow down");
                limited += 1;
            }
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!((ok, limited), (10, 5));
    assert_eq!(adapter.calls(), 10);
}

#[tokio::test]
async fn test_quota_is_per_identity() {
    let adapter = RecordingAdapter::new(Behavior::Echo);
    let server = server_with(&common::test_config(), adapter.clone());
    let router = server.router();
    let alice = common::token_for("alice", "user");
    let bob = common::token_for("bob", "user");

    for _ in 0..10 {
        let response = router
            .clone()
            .oneshot(common::post_json("/api/openai/chat", Some(&alice), &json!({ "prompt": "hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = router
        .oneshot(common::post_json("/api/openai/chat", Some(&bob), &json!({ "prompt": "hi" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_credential_rejected_before_anything_else() {
    let adapter = RecordingAdapter::new(Behavior::Echo);
    let server = server_with(&common::test_config(), adapter.clone());

    let response = server
        .router()
        .oneshot(common::post_json("/api/openai/chat", None, &json!({ "prompt": "hi" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = common::json_body(response).await;
    assert_eq!(body["error"], "Access token required");
    assert_eq!(adapter.calls(), 0);
    assert!(server.state().audit_log.is_empty());
}

#[tokio::test]
async fn test_forged_credential_rejected() {
    let adapter = RecordingAdapter::new(Behavior::Echo);
    let server = server_with(&common::test_config(), adapter.clone());
    let mut token = common::token_for("user123", "user");
    // Flip one character in the middle of the signature segment.
    let i = token.rfind('.').unwrap() + 5;
    let flipped = if &token[i..i + 1] == "A" { "B" } else { "A" };
    token.replace_range(i..i + 1, flipped);

    let response = server
        .router()
        .oneshot(common::post_json("/api/openai/chat", Some(&token), &json!({ "prompt": "hi" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = common::json_body(response).await;
    assert_eq!(body["error"], "Invalid or expired token");
    assert_eq!(adapter.calls(), 0);
}

#[tokio::test]
async fn test_adapter_failure_is_generic_and_audited_once() {
    let adapter = RecordingAdapter::new(Behavior::Fail);
    let server = server_with(&common::test_config(), adapter.clone());
    let token = common::token_for("user123", "user");

    let response = server
        .router()
        .oneshot(common::post_json(
            "/api/huggingface/analyze",
            Some(&token),
            &json!({ "text": "call me at 555-123-4567" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = common::json_body(response).await;
    assert_eq!(body["error"], "Internal server error");
    assert!(!body.to_string().contains("provider.internal"));

    let records = server.state().audit_log.recent(10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status_code, Some(500));
    assert_eq!(
        records[0].correlation_id.to_string(),
        body["correlationId"].as_str().unwrap()
    );
    assert!(records[0]
        .error_detail
        .as_deref()
        .is_some_and(|d| d.contains("provider.internal")));
}

#[tokio::test]
async fn test_adapter_panic_is_audited_as_internal_error() {
    let adapter = RecordingAdapter::new(Behavior::Panic);
    let server = server_with(&common::test_config(), adapter.clone());
    let token = common::token_for("user123", "user");

    let response = server
        .router()
        .oneshot(common::post_json(
            "/api/openai/chat",
            Some(&token),
            &json!({ "prompt": "hello" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = common::json_body(response).await;
    assert_eq!(body["error"], "Internal server error");
    assert!(!body.to_string().contains("crashed"));

    let records = server.state().audit_log.recent(10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status_code, Some(500));
    assert_eq!(
        records[0].correlation_id.to_string(),
        body["correlationId"].as_str().unwrap()
    );
    assert!(records[0]
        .error_detail
        .as_deref()
        .is_some_and(|d| d.contains("upstream adapter failed")));
}

#[tokio::test]
async fn test_validation_errors() {
    let adapter = RecordingAdapter::new(Behavior::Echo);
    let server = server_with(&common::test_config(), adapter.clone());
    let token = common::token_for("user123", "user");

    let response = server
        .router()
        .oneshot(common::post_json("/api/huggingface/analyze", Some(&token), &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::json_body(response).await["error"], "Text is required");

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/openai/chat")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from("{not json"))
        .unwrap();
    let response = server.router().oneshot(malformed).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(adapter.calls(), 0);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let adapter = RecordingAdapter::new(Behavior::Echo);
    let mut config = common::test_config();
    config.security.max_body_size = 1024;
    let server = server_with(&config, adapter.clone());
    let token = common::token_for("user123", "user");

    let response = server
        .router()
        .oneshot(common::post_json(
            "/api/openai/chat",
            Some(&token),
            &json!({ "prompt": "x".repeat(4096) }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(adapter.calls(), 0);
}

#[tokio::test]
async fn test_login_then_chat() {
    let server = HttpServer::new(&common::test_config());

    let response = server
        .router()
        .oneshot(common::post_json(
            "/api/auth/login",
            None,
            &json!({ "username": "demo", "password": "password123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::json_body(response).await;
    assert_eq!(body["user"]["id"], "user123");
    let token = body["token"].as_str().unwrap().to_string();

    let response = server
        .router()
        .oneshot(common::post_json(
            "/api/openai/chat",
            Some(&token),
            &json!({ "prompt": "Hello, my email is john.doe@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::json_body(response).await;
    let content = body["data"]["payload"]["choices"][0]["message"]["content"]
        .as_str()
        .unwrap();
    assert!(content.starts_with("Mock response to:"));
    assert!(!content.contains("john.doe@example.com"));
}

#[tokio::test]
async fn test_bad_login_rejected() {
    let server = HttpServer::new(&common::test_config());

    let response = server
        .router()
        .oneshot(common::post_json(
            "/api/auth/login",
            None,
            &json!({ "username": "demo", "password": "nope" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(common::json_body(response).await["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_audit_endpoint_requires_admin() {
    let adapter = RecordingAdapter::new(Behavior::Echo);
    let server = server_with(&common::test_config(), adapter);
    let user = common::token_for("user123", "user");
    let admin = common::token_for("root", "admin");

    server
        .router()
        .oneshot(common::post_json("/api/openai/chat", Some(&user), &json!({ "prompt": "hi" })))
        .await
        .unwrap();

    let response = server
        .router()
        .oneshot(common::get("/api/admin/audit", Some(&user)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(common::json_body(response).await["error"], "Insufficient role");

    let response = server
        .router()
        .oneshot(common::get("/api/admin/audit?limit=5", Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::json_body(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["records"][0]["identityId"], "user123");
}

#[tokio::test]
async fn test_unknown_path_and_headers() {
    let server = HttpServer::new(&common::test_config());

    let response = server
        .router()
        .oneshot(common::get("/api/nope", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert!(response.headers().contains_key("x-request-id"));
    let body = common::json_body(response).await;
    assert_eq!(body, json!({ "error": "Endpoint not found", "path": "/api/nope" }));

    let response = server
        .router()
        .oneshot(common::get("/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::json_body(response).await["status"], "healthy");
}

#[tokio::test(start_paused = true)]
async fn test_upstream_deadline_maps_to_500() {
    let adapter = RecordingAdapter::new(Behavior::Stall(Duration::from_secs(60)));
    let mut config = common::test_config();
    config.timeouts.upstream_secs = 1;
    let server = server_with(&config, adapter.clone());
    let token = common::token_for("user123", "user");

    let response = server
        .router()
        .oneshot(common::post_json("/api/openai/chat", Some(&token), &json!({ "prompt": "hi" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let records = server.state().audit_log.recent(1);
    assert!(records[0]
        .error_detail
        .as_deref()
        .is_some_and(|d| d.contains("exceeded")));
}

#[tokio::test(start_paused = true)]
async fn test_client_disconnect_still_closes_record() {
    let adapter = RecordingAdapter::new(Behavior::Stall(Duration::from_secs(2)));
    let server = server_with(&common::test_config(), adapter.clone());
    let token = common::token_for("user123", "user");

    let request = server
        .router()
        .oneshot(common::post_json("/api/openai/chat", Some(&token), &json!({ "prompt": "hi" })));
    // The caller gives up long before the upstream answers.
    assert!(tokio::time::timeout(Duration::from_millis(100), request).await.is_err());

    tokio::time::sleep(Duration::from_secs(5)).await;

    let records = server.state().audit_log.recent(10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status_code, Some(500));
    assert_eq!(adapter.calls(), 1);
}

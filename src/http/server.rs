//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the pipeline and its collaborators from `GatewayConfig`
//! - Create the Axum router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit, headers)
//! - Serve on a listener until shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::audit::{AuditRecorder, AuditSink, FanoutSink, JsonLinesSink, MemorySink, TracingSink};
use crate::config::GatewayConfig;
use crate::pipeline::{AiRoute, Pipeline};
use crate::security::headers::apply_security_headers;
use crate::security::{CredentialIssuer, IdentityVerifier, PolicySet, RateGovernor};
use crate::upstream::{MockChatAdapter, MockClassifierAdapter, UpstreamAdapter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub issuer: Arc<CredentialIssuer>,
    /// Bounded copy of recent audit records, served to admins.
    pub audit_log: Arc<MemorySink>,
    pub chat: AiRoute,
    pub analyze: AiRoute,
}

impl AppState {
    /// Build state with the given upstream adapters.
    pub fn new(
        config: &GatewayConfig,
        chat: Arc<dyn UpstreamAdapter>,
        analyze: Arc<dyn UpstreamAdapter>,
    ) -> Self {
        let audit_log = Arc::new(MemorySink::new(config.audit.recent_capacity));

        let mut sinks: Vec<Arc<dyn AuditSink>> = vec![audit_log.clone() as Arc<dyn AuditSink>];
        if config.audit.log_events {
            sinks.push(Arc::new(TracingSink));
        }
        if let Some(path) = &config.audit.log_file {
            sinks.push(Arc::new(JsonLinesSink::new(path)));
        }

        let governor = if config.rate_limit.enabled {
            RateGovernor::in_memory()
        } else {
            tracing::warn!("Rate limiting disabled by configuration");
            RateGovernor::disabled()
        };

        let pipeline = Pipeline::new(
            IdentityVerifier::new(&config.auth.jwt_secret),
            governor,
            AuditRecorder::new(Arc::new(FanoutSink::new(sinks))),
            PolicySet::from_config(&config.rate_limit),
            Duration::from_secs(config.timeouts.upstream_secs),
        );

        let issuer = CredentialIssuer::new(
            &config.auth.jwt_secret,
            config.auth.token_ttl_secs,
            config.auth.users.clone(),
        );

        Self {
            pipeline: Arc::new(pipeline),
            issuer: Arc::new(issuer),
            audit_log,
            chat: AiRoute::chat(&config.upstream, chat),
            analyze: AiRoute::analyze(&config.upstream, analyze),
        }
    }

    /// Build state with the simulated providers.
    pub fn with_mock_upstreams(config: &GatewayConfig) -> Self {
        let latency = Duration::from_millis(config.upstream.simulated_latency_ms);
        Self::new(
            config,
            Arc::new(MockChatAdapter::new(latency)),
            Arc::new(MockClassifierAdapter::new(latency)),
        )
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server backed by the simulated providers.
    pub fn new(config: &GatewayConfig) -> Self {
        Self::with_state(config, AppState::with_mock_upstreams(config))
    }

    pub fn with_state(config: &GatewayConfig, state: AppState) -> Self {
        let router = build_router(config, state.clone());
        Self { router, state }
    }

    /// The fully layered router, for serving or for `oneshot` tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve on `listener` until `shutdown` resolves, then drain.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
fn build_router(config: &GatewayConfig, state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/openai/chat", post(handlers::chat))
        .route("/api/huggingface/analyze", post(handlers::analyze))
        .route("/api/admin/audit", get(handlers::admin_audit))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
        );

    if config.security.enable_headers {
        apply_security_headers(router)
    } else {
        router
    }
}

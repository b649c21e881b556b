//! Secure AI gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ identity verifier ──▶ rate governor (general)
//!                                                                  │
//!                                                                  ▼
//!                     audit open ──▶ rate governor (ai-call) ──▶ redactor
//!                                                                  │
//!                                                                  ▼
//!     Client Response                                       upstream adapter
//!     ◀────────────── envelope ◀── audit close ◀────────────────────┘
//!
//!     Cross-cutting: config, observability, lifecycle, resilience (deadlines)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use ai_gateway::config::{default_config, load_config, uses_placeholder_secret};
use ai_gateway::lifecycle::{shutdown_signal, Shutdown};
use ai_gateway::observability::{logging, metrics};
use ai_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "ai-gateway")]
#[command(about = "Secure gateway in front of AI inference providers", long_about = None)]
struct Args {
    /// Path to a TOML config file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => default_config()?,
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ai-gateway starting");

    if uses_placeholder_secret(&config) {
        tracing::warn!("auth.jwt_secret is the built-in placeholder; set JWT_SECRET in production");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        rate_limiting = config.rate_limit.enabled,
        audit_file = ?config.audit.log_file,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    let server = HttpServer::new(&config);
    server.run(listener, shutdown.wait()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admission Gate Service
//!
//! Runs the two-layer rate limiter in front of the blog API:
//!
//! - 20 requests per 20 s per IP, sticky block on overflow (default)
//! - 20 requests per 20 s per session (default)
//! - IP state cleared every 45 minutes (default)
//! - Expired session allotments dropped every minute (default)
//!
//! ## Usage
//!
//! 1. **In-path**: every request that is not `/health`, `/check` or the
//!    metrics path goes through the admission middleware.
//!
//! 2. **External check**: a proxy posts `{"ip": ..., "session": ...}` to
//!    `/check` and enforces the decision itself.
//!
//! ## Configuration
//!
//! Loaded from `CONFIG_FILE` (JSON) and environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `IP_MAX_REQUESTS` / `IP_WINDOW_SECS`: IP gate quota (default: 20 / 20)
//! - `SESSION_MAX_REQUESTS` / `SESSION_WINDOW_SECS`: session gate quota (default: 20 / 20)
//! - `SWEEP_PERIOD_SECS`: IP state sweep period (default: 2700)
//! - `SESSION_PRUNE_SECS`: expired session pruning period (default: 60)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use admission_gate::{
    config::Config,
    handlers::{router, AppState},
    metrics::AdmissionMetrics,
    pipeline::AdmissionPipeline,
    sweeper::{EvictionSweeper, SessionPruner},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::load()?;
    info!(
        bind_addr = %config.bind_addr,
        ip_max_requests = config.ip_gate.max_requests,
        ip_window_secs = config.ip_gate.window_secs,
        session_max_requests = config.session_gate.max_requests,
        session_window_secs = config.session_gate.window_secs,
        sweep_period_secs = config.sweeper.period_secs,
        session_prune_secs = config.sweeper.session_prune_secs,
        "Starting admission gate"
    );

    let metrics = AdmissionMetrics::new()?;
    let pipeline = AdmissionPipeline::from_config(&config, metrics.clone());

    let sweeper = EvictionSweeper::new(pipeline.ip_gate().store().clone(), config.sweeper.period())
        .with_metrics(metrics.clone())
        .spawn();
    let pruner = SessionPruner::new(
        pipeline.session_gate().clone(),
        config.sweeper.session_prune_period(),
    )
    .with_metrics(metrics)
    .spawn();

    let state = Arc::new(AppState::new(pipeline, config.clone()));
    let app = router(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.shutdown().await;
    pruner.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

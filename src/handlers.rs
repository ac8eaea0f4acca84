// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP surface of the admission gate.
//!
//! The service runs in two modes at once:
//!
//! 1. **In-path middleware**: [`admission`] sits in front of every gated
//!    route and answers 429 before the inner handler runs.
//! 2. **External check**: a proxy posts the client identity to `/check` and
//!    enforces the returned decision itself.

use crate::config::{Config, SessionConfig};
use crate::pipeline::{AdmissionDecision, AdmissionPipeline, RequestDescriptor};
use crate::session_gate::SessionId;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Shared application state.
pub struct AppState {
    pub pipeline: AdmissionPipeline,
    pub config: Config,
    connect_info_warned: AtomicBool,
}

impl AppState {
    pub fn new(pipeline: AdmissionPipeline, config: Config) -> Self {
        Self {
            pipeline,
            config,
            connect_info_warned: AtomicBool::new(false),
        }
    }

    fn warn_connect_info_missing(&self) {
        if !self.connect_info_warned.swap(true, Ordering::Relaxed) {
            warn!(
                "ConnectInfo not available; all requests share the 0.0.0.0 IP bucket. \
                 Serve with into_make_service_with_connect_info::<SocketAddr>()."
            );
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// Admission check request (for external enforcement).
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub ip: String,
    #[serde(default)]
    pub session: Option<SessionId>,
}

/// Admission check response.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Build the service router.
///
/// Everything that is not an operational endpoint falls through to the
/// gated fallback, which stands in for the business handlers.
pub fn router(state: Arc<AppState>) -> Router {
    let gated = Router::new()
        .fallback(admitted)
        .layer(middleware::from_fn_with_state(state.clone(), admission));

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/check", post(check));
    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.merge(gated)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Admission middleware: IP gate, then session gate, then the inner service.
pub async fn admission(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let client_ip = match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => addr.ip(),
        None => {
            state.warn_connect_info_missing();
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        }
    };
    let session = request
        .extensions()
        .get::<SessionId>()
        .cloned()
        .or_else(|| session_from_headers(request.headers(), &state.config.session));

    let descriptor = RequestDescriptor::new(client_ip, session);
    match state.pipeline.evaluate(&descriptor) {
        AdmissionDecision::Admitted => next.run(request).await,
        AdmissionDecision::Rejected(gate) => {
            info!(
                ip = %client_ip,
                path = %request.uri().path(),
                reason = %gate,
                "Request rate limited"
            );
            (
                AdmissionDecision::REJECT_STATUS,
                Json(ErrorResponse {
                    error: gate.to_string(),
                    code: "RATE_LIMITED",
                }),
            )
                .into_response()
        }
    }
}

/// Find the session id in the configured header, then the configured cookie.
pub fn session_from_headers(headers: &HeaderMap, config: &SessionConfig) -> Option<SessionId> {
    if !config.header.is_empty() {
        let from_header = headers
            .get(config.header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(id) = from_header {
            return Some(SessionId::new(id));
        }
    }

    if config.cookie.is_empty() {
        return None;
    }
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == config.cookie && !value.is_empty())
        .map(|(_, value)| SessionId::new(value))
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "admission-gate",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Evaluate a request on behalf of a proxy.
///
/// Answers 200 either way so the proxy can read the body.
pub async fn check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> impl IntoResponse {
    debug!(ip = %req.ip, session = ?req.session, "Processing admission check");

    let ip: IpAddr = match req.ip.parse() {
        Ok(ip) => ip,
        Err(_) => {
            warn!(ip = %req.ip, "Invalid IP address format");
            return (
                StatusCode::BAD_REQUEST,
                Json(CheckResponse {
                    allowed: false,
                    reason: Some("Invalid IP address format".to_string()),
                }),
            );
        }
    };

    let descriptor = RequestDescriptor::new(ip, req.session);
    let response = match state.pipeline.evaluate(&descriptor) {
        AdmissionDecision::Admitted => CheckResponse {
            allowed: true,
            reason: None,
        },
        AdmissionDecision::Rejected(gate) => {
            info!(ip = %ip, reason = %gate, "Request rate limited");
            CheckResponse {
                allowed: false,
                reason: Some(gate.to_string()),
            }
        }
    };
    (StatusCode::OK, Json(response))
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.pipeline.render_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Stand-in for the business handlers behind the gate.
async fn admitted() -> impl IntoResponse {
    (StatusCode::OK, [("X-Admission", "admitted")], "Request admitted")
}

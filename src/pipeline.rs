// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Ordered evaluation of the admission gates.
//!
//! The IP gate always runs first. The session gate only sees requests the IP
//! gate admitted, and only when the request carries a session id.

use crate::config::Config;
use crate::ip_gate::{IpGate, IpOutcome};
use crate::metrics::AdmissionMetrics;
use crate::session_gate::{SessionGate, SessionId};
use crate::store::RateStore;
use axum::http::StatusCode;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Decision of a single gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected,
}

/// Gate that turned a request away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectedBy {
    Ip,
    Session,
}

impl RejectedBy {
    /// Metric label for this gate.
    pub fn label(self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Session => "session",
        }
    }
}

impl std::fmt::Display for RejectedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ip => write!(f, "IP rate limit exceeded"),
            Self::Session => write!(f, "Session rate limit exceeded"),
        }
    }
}

/// Outcome of the whole pipeline for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdmissionDecision {
    Admitted,
    Rejected(RejectedBy),
}

impl AdmissionDecision {
    /// Status every rejection is answered with.
    pub const REJECT_STATUS: StatusCode = StatusCode::TOO_MANY_REQUESTS;

    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }

    /// Status the HTTP layer must answer with, `None` when the request may proceed.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Admitted => None,
            Self::Rejected(_) => Some(Self::REJECT_STATUS),
        }
    }
}

/// Identity of an inbound request as seen by the gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub client_ip: IpAddr,
    pub session: Option<SessionId>,
}

impl RequestDescriptor {
    pub fn new(client_ip: IpAddr, session: Option<SessionId>) -> Self {
        Self { client_ip, session }
    }
}

/// IP gate followed by session gate.
pub struct AdmissionPipeline {
    ip_gate: IpGate,
    session_gate: SessionGate,
    metrics: AdmissionMetrics,
}

impl AdmissionPipeline {
    pub fn new(ip_gate: IpGate, session_gate: SessionGate, metrics: AdmissionMetrics) -> Self {
        Self {
            ip_gate,
            session_gate,
            metrics,
        }
    }

    /// Build both gates over fresh stores.
    pub fn from_config(config: &Config, metrics: AdmissionMetrics) -> Self {
        let ip_gate = IpGate::new(Arc::new(RateStore::new()), config.ip_gate);
        let session_gate = SessionGate::new(Arc::new(RateStore::new()), config.session_gate);
        Self::new(ip_gate, session_gate, metrics)
    }

    /// Evaluate a request arriving now.
    pub fn evaluate(&self, request: &RequestDescriptor) -> AdmissionDecision {
        self.evaluate_at(request, Instant::now())
    }

    /// Evaluate a request arriving at `now`.
    pub fn evaluate_at(&self, request: &RequestDescriptor, now: Instant) -> AdmissionDecision {
        let decision = self.decide(request, now);

        match decision {
            AdmissionDecision::Admitted => self.metrics.admitted.inc(),
            AdmissionDecision::Rejected(gate) => {
                self.metrics.rejected.with_label_values(&[gate.label()]).inc()
            }
        }
        debug!(ip = %request.client_ip, session = ?request.session, ?decision, "Admission decided");
        decision
    }

    fn decide(&self, request: &RequestDescriptor, now: Instant) -> AdmissionDecision {
        let ip_outcome = self.ip_gate.check_at(request.client_ip, now);
        if ip_outcome == IpOutcome::Blocked {
            self.metrics.ip_blocks.inc();
        }
        if ip_outcome.admission() == Admission::Rejected {
            return AdmissionDecision::Rejected(RejectedBy::Ip);
        }

        if let Some(session) = &request.session {
            if self.session_gate.check_at(session, now) == Admission::Rejected {
                return AdmissionDecision::Rejected(RejectedBy::Session);
            }
        }

        AdmissionDecision::Admitted
    }

    pub fn ip_gate(&self) -> &IpGate {
        &self.ip_gate
    }

    pub fn session_gate(&self) -> &SessionGate {
        &self.session_gate
    }

    pub fn metrics(&self) -> &AdmissionMetrics {
        &self.metrics
    }

    /// Render metrics with fresh tracked-key gauges.
    pub fn render_metrics(&self) -> prometheus::Result<String> {
        self.metrics.tracked_ips.set(self.ip_gate.tracked() as i64);
        self.metrics
            .tracked_sessions
            .set(self.session_gate.tracked() as i64);
        self.metrics.render()
    }
}

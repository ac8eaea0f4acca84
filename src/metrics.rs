// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for admission decisions and sweeps.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Counters for the admission pipeline, kept in a private registry.
#[derive(Clone)]
pub struct AdmissionMetrics {
    registry: Registry,
    pub admitted: IntCounter,
    pub rejected: IntCounterVec,
    pub ip_blocks: IntCounter,
    pub sweeps: IntCounter,
    pub sessions_pruned: IntCounter,
    pub tracked_ips: IntGauge,
    pub tracked_sessions: IntGauge,
}

impl AdmissionMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let admitted = IntCounter::new("admission_admitted_total", "Requests admitted")?;
        let rejected = IntCounterVec::new(
            Opts::new("admission_rejected_total", "Requests rejected with 429"),
            &["gate"],
        )?;
        let ip_blocks = IntCounter::new(
            "admission_ip_blocks_total",
            "IPs blocked until the next sweep",
        )?;
        let sweeps = IntCounter::new("admission_sweeps_total", "IP state sweeps performed")?;
        let sessions_pruned = IntCounter::new(
            "admission_sessions_pruned_total",
            "Expired session allotments dropped",
        )?;
        let tracked_ips = IntGauge::new("admission_tracked_ips", "IPs with rate state")?;
        let tracked_sessions =
            IntGauge::new("admission_tracked_sessions", "Sessions with rate state")?;

        registry.register(Box::new(admitted.clone()))?;
        registry.register(Box::new(rejected.clone()))?;
        registry.register(Box::new(ip_blocks.clone()))?;
        registry.register(Box::new(sweeps.clone()))?;
        registry.register(Box::new(sessions_pruned.clone()))?;
        registry.register(Box::new(tracked_ips.clone()))?;
        registry.register(Box::new(tracked_sessions.clone()))?;

        Ok(Self {
            registry,
            admitted,
            rejected,
            ip_blocks,
            sweeps,
            sessions_pruned,
            tracked_ips,
            tracked_sessions,
        })
    }

    /// Encode every metric in the Prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

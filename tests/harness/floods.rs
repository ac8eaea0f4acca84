// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Flood patterns replayed against the pipeline.

use super::generators;
use super::tally::Tally;
use admission_gate::{AdmissionPipeline, RequestDescriptor};
use std::time::{Duration, Instant};

/// Flood pattern configuration.
#[derive(Debug, Clone)]
pub struct FloodConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Synthetic time between consecutive requests
    pub spacing: Duration,
    /// Number of unique IPs to rotate through
    pub unique_ips: usize,
    /// Number of unique sessions to rotate through (0 = no session id)
    pub unique_sessions: usize,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            spacing: Duration::from_millis(100),
            unique_ips: 1,
            unique_sessions: 1,
        }
    }
}

/// Predefined flood patterns.
impl FloodConfig {
    /// Single IP hammering the API.
    pub fn single_ip_flood() -> Self {
        Self {
            total_requests: 200,
            spacing: Duration::from_millis(10),
            ..Default::default()
        }
    }

    /// Many IPs, each staying under its own quota.
    pub fn distributed_flood() -> Self {
        Self {
            total_requests: 500,
            spacing: Duration::from_millis(2),
            unique_ips: 100,
            unique_sessions: 100,
        }
    }

    /// One session shared across many IPs.
    pub fn session_hopping() -> Self {
        Self {
            total_requests: 100,
            spacing: Duration::from_millis(5),
            unique_ips: 50,
            unique_sessions: 1,
        }
    }

    /// One request every two seconds from a single client.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 60,
            spacing: Duration::from_secs(2),
            ..Default::default()
        }
    }

    /// Replay the flood starting at `start`.
    pub fn run(&self, pipeline: &AdmissionPipeline, start: Instant) -> Tally {
        let ips = generators::generate_ips(self.unique_ips);
        let sessions = generators::generate_sessions(self.unique_sessions);

        let mut tally = Tally::new();
        for i in 0..self.total_requests {
            let ip = ips[i % ips.len()];
            let session = if sessions.is_empty() {
                None
            } else {
                Some(sessions[i % sessions.len()].clone())
            };
            let now = start + self.spacing * i as u32;

            let decision = pipeline.evaluate_at(&RequestDescriptor::new(ip, session), now);
            tally.record(ip, decision);
        }
        tally
    }
}

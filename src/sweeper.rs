// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Periodic maintenance of the rate stores.
//!
//! [`EvictionSweeper`] clears all IP state; a sweep is the only thing that
//! lifts an IP block. [`SessionPruner`] drops session allotments whose window
//! has elapsed and never touches IP state.

use crate::ip_gate::IpState;
use crate::metrics::AdmissionMetrics;
use crate::session_gate::SessionGate;
use crate::store::RateStore;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

/// Longest period a maintenance task accepts (30 days).
pub const MAX_PERIOD: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Clears the IP store on a fixed period.
pub struct EvictionSweeper {
    store: Arc<RateStore<IpAddr, IpState>>,
    period: Duration,
    metrics: Option<AdmissionMetrics>,
}

/// Drops expired session allotments on a fixed period.
pub struct SessionPruner {
    gate: SessionGate,
    period: Duration,
    metrics: Option<AdmissionMetrics>,
}

/// Handle to a running maintenance task. Dropping it stops the task.
pub struct SweeperHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl EvictionSweeper {
    /// Periods above [`MAX_PERIOD`] are capped.
    pub fn new(store: Arc<RateStore<IpAddr, IpState>>, period: Duration) -> Self {
        Self {
            store,
            period: period.min(MAX_PERIOD),
            metrics: None,
        }
    }

    /// Count sweeps in the given metrics.
    pub fn with_metrics(mut self, metrics: AdmissionMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Clear all IP state once. Returns the number of entries dropped.
    pub fn sweep(&self) -> usize {
        let cleared = self.store.clear();
        if let Some(metrics) = &self.metrics {
            metrics.sweeps.inc();
        }
        info!(cleared, "Cleared cache for IP addresses");
        cleared
    }

    /// Run the sweeper on the current tokio runtime.
    ///
    /// The first sweep happens one full period after this call.
    pub fn spawn(self) -> SweeperHandle {
        let period = self.period;
        spawn_periodic("Eviction sweeper", period, move || {
            self.sweep();
        })
    }
}

impl SessionPruner {
    /// Periods above [`MAX_PERIOD`] are capped.
    pub fn new(gate: SessionGate, period: Duration) -> Self {
        Self {
            gate,
            period: period.min(MAX_PERIOD),
            metrics: None,
        }
    }

    /// Count pruned sessions in the given metrics.
    pub fn with_metrics(mut self, metrics: AdmissionMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Drop every allotment expired at `now`. Returns how many were dropped.
    pub fn prune_at(&self, now: std::time::Instant) -> usize {
        let pruned = self.gate.prune_expired(now);
        if let Some(metrics) = &self.metrics {
            metrics.sessions_pruned.inc_by(pruned as u64);
        }
        debug!(pruned, remaining = self.gate.tracked(), "Pruned expired sessions");
        pruned
    }

    /// Run the pruner on the current tokio runtime.
    pub fn spawn(self) -> SweeperHandle {
        let period = self.period;
        spawn_periodic("Session pruner", period, move || {
            self.prune_at(Instant::now().into_std());
        })
    }
}

fn spawn_periodic<F>(name: &'static str, period: Duration, mut tick: F) -> SweeperHandle
where
    F: FnMut() + Send + 'static,
{
    let (shutdown, mut shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        loop {
            tokio::select! {
                _ = ticker.tick() => tick(),
                _ = &mut shutdown_rx => break,
            }
        }
        info!(task = name, "Maintenance task stopped");
    });

    SweeperHandle { shutdown, task }
}

impl SweeperHandle {
    /// Stop the task and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "Maintenance task failed");
        }
    }
}

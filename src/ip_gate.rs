// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-IP fixed window gate with sticky blocking.
//!
//! An IP that goes over quota inside a window is blocked until the next
//! eviction sweep clears the store. Elapsed time alone never lifts a block.

use crate::config::GateConfig;
use crate::pipeline::Admission;
use crate::store::RateStore;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Rate state for one IP address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpState {
    /// Start of the current counting window
    pub first_request_at: Instant,
    /// Requests counted in the current window
    pub request_count: u32,
    /// Set on the first overflow; only a sweep clears it
    pub blocked: bool,
}

/// What the gate did with a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpOutcome {
    /// First request seen from this IP
    Fresh,
    /// Counted inside the current window
    Counted,
    /// Previous window elapsed, a new one started with this request
    WindowReset,
    /// Quota exceeded inside the window; the IP is now blocked
    Blocked,
    /// IP was already blocked
    StillBlocked,
}

impl IpOutcome {
    pub fn admission(self) -> Admission {
        match self {
            Self::Fresh | Self::Counted | Self::WindowReset => Admission::Admitted,
            Self::Blocked | Self::StillBlocked => Admission::Rejected,
        }
    }
}

impl IpState {
    fn fresh(now: Instant) -> Self {
        Self {
            first_request_at: now,
            request_count: 1,
            blocked: false,
        }
    }

    /// Compute the state after one more request at `now`.
    pub fn advance(
        current: Option<IpState>,
        now: Instant,
        max_requests: u32,
        window: Duration,
    ) -> (IpState, IpOutcome) {
        let Some(mut state) = current else {
            return (Self::fresh(now), IpOutcome::Fresh);
        };

        if state.blocked {
            return (state, IpOutcome::StillBlocked);
        }

        if now.saturating_duration_since(state.first_request_at) >= window {
            return (Self::fresh(now), IpOutcome::WindowReset);
        }

        if state.request_count >= max_requests {
            state.blocked = true;
            return (state, IpOutcome::Blocked);
        }

        state.request_count += 1;
        (state, IpOutcome::Counted)
    }
}

/// Fixed window admission gate keyed by client IP.
#[derive(Debug)]
pub struct IpGate {
    store: Arc<RateStore<IpAddr, IpState>>,
    max_requests: u32,
    window: Duration,
}

impl IpGate {
    /// Create a gate over an injected store.
    ///
    /// The store is shared with the eviction sweeper.
    pub fn new(store: Arc<RateStore<IpAddr, IpState>>, config: GateConfig) -> Self {
        Self {
            store,
            max_requests: config.max_requests,
            window: config.window(),
        }
    }

    /// Evaluate a request from `ip` arriving now.
    pub fn check(&self, ip: IpAddr) -> IpOutcome {
        self.check_at(ip, Instant::now())
    }

    /// Evaluate a request from `ip` arriving at `now`.
    pub fn check_at(&self, ip: IpAddr, now: Instant) -> IpOutcome {
        let (max_requests, window) = (self.max_requests, self.window);
        let outcome = self
            .store
            .update(ip, |current| IpState::advance(current, now, max_requests, window));

        match outcome {
            IpOutcome::Blocked => warn!(
                %ip,
                max_requests,
                window_secs = window.as_secs(),
                "IP exceeded quota, blocking until next sweep"
            ),
            other => debug!(%ip, outcome = ?other, "IP gate evaluated"),
        }
        outcome
    }

    /// Current state for `ip`, if tracked.
    pub fn state(&self, ip: IpAddr) -> Option<IpState> {
        self.store.get(&ip)
    }

    /// Number of IPs currently tracked.
    pub fn tracked(&self) -> usize {
        self.store.len()
    }

    pub fn store(&self) -> &Arc<RateStore<IpAddr, IpState>> {
        &self.store
    }
}

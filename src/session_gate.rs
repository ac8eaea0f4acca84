// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-session allotment gate.
//!
//! Each session gets `max_requests` tokens per window. The allotment is
//! replaced wholesale once the window has elapsed, so sessions recover on
//! their own.

use crate::config::GateConfig;
use crate::pipeline::Admission;
use crate::store::RateStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Opaque session identifier assigned by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Token allotment for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    /// When the current allotment was issued
    pub first_request_at: Instant,
    /// Tokens left in the current allotment
    pub tokens_remaining: u32,
}

impl SessionState {
    /// Compute the state after one more request at `now`.
    pub fn advance(
        current: Option<SessionState>,
        now: Instant,
        max_requests: u32,
        window: Duration,
    ) -> (SessionState, Admission) {
        let mut state = match current {
            Some(state) if now.saturating_duration_since(state.first_request_at) < window => state,
            _ => SessionState {
                first_request_at: now,
                tokens_remaining: max_requests,
            },
        };

        if state.tokens_remaining > 0 {
            state.tokens_remaining -= 1;
            (state, Admission::Admitted)
        } else {
            (state, Admission::Rejected)
        }
    }
}

/// Token allotment gate keyed by session.
///
/// Clones share the same store.
#[derive(Debug, Clone)]
pub struct SessionGate {
    store: Arc<RateStore<SessionId, SessionState>>,
    max_requests: u32,
    window: Duration,
}

impl SessionGate {
    pub fn new(store: Arc<RateStore<SessionId, SessionState>>, config: GateConfig) -> Self {
        Self {
            store,
            max_requests: config.max_requests,
            window: config.window(),
        }
    }

    /// Evaluate a request for `session` arriving now.
    pub fn check(&self, session: &SessionId) -> Admission {
        self.check_at(session, Instant::now())
    }

    /// Evaluate a request for `session` arriving at `now`.
    pub fn check_at(&self, session: &SessionId, now: Instant) -> Admission {
        let (max_requests, window) = (self.max_requests, self.window);
        let admission = self.store.update(session.clone(), |current| {
            SessionState::advance(current, now, max_requests, window)
        });
        debug!(%session, ?admission, "Session gate evaluated");
        admission
    }

    /// Current allotment for `session`, if tracked.
    pub fn state(&self, session: &SessionId) -> Option<SessionState> {
        self.store.get(session)
    }

    /// Drop the allotment of a session that has ended.
    pub fn forget(&self, session: &SessionId) {
        if self.store.remove(session).is_some() {
            debug!(%session, "Session state dropped");
        }
    }

    /// Drop allotments whose window elapsed before `now`.
    ///
    /// An expired allotment is replaced wholesale on the session's next
    /// request, so dropping it early never changes a decision.
    pub fn prune_expired(&self, now: Instant) -> usize {
        let window = self.window;
        self.store
            .retain(|_, state| now.saturating_duration_since(state.first_request_at) < window)
    }

    /// Number of sessions currently tracked.
    pub fn tracked(&self) -> usize {
        self.store.len()
    }
}

// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admission Gate
//!
//! Inbound-request admission control for the blog API:
//!
//! - Per-IP fixed window limit (20 requests / 20 s default); going over
//!   quota inside a window blocks the IP until the next sweep
//! - Per-session token allotment (20 requests / 20 s default), refilled
//!   wholesale when the window elapses
//! - Eviction sweep clearing all IP state (every 45 minutes default)
//! - Pruning of expired session allotments (every minute default)
//! - 429 Too Many Requests for any rejection

pub mod config;
pub mod error;
pub mod handlers;
pub mod ip_gate;
pub mod metrics;
pub mod pipeline;
pub mod session_gate;
pub mod store;
pub mod sweeper;

pub use config::Config;
pub use ip_gate::{IpGate, IpOutcome, IpState};
pub use pipeline::{Admission, AdmissionDecision, AdmissionPipeline, RejectedBy, RequestDescriptor};
pub use session_gate::{SessionGate, SessionId, SessionState};
pub use store::RateStore;
pub use sweeper::{EvictionSweeper, SessionPruner, SweeperHandle};

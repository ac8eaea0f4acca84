// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Decision tally for flood simulation results.

use admission_gate::{AdmissionDecision, RejectedBy};
use std::collections::HashMap;
use std::net::IpAddr;

/// Counts pipeline decisions during a flood.
#[derive(Debug, Default)]
pub struct Tally {
    decisions: HashMap<AdmissionDecision, usize>,
    admitted_per_ip: HashMap<IpAddr, usize>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, ip: IpAddr, decision: AdmissionDecision) {
        *self.decisions.entry(decision).or_insert(0) += 1;
        if decision.is_admitted() {
            *self.admitted_per_ip.entry(ip).or_insert(0) += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.decisions.values().sum()
    }

    pub fn admitted(&self) -> usize {
        self.count(AdmissionDecision::Admitted)
    }

    pub fn rejected_by(&self, gate: RejectedBy) -> usize {
        self.count(AdmissionDecision::Rejected(gate))
    }

    /// Most requests admitted for any single IP.
    pub fn max_admitted_per_ip(&self) -> usize {
        self.admitted_per_ip.values().copied().max().unwrap_or(0)
    }

    fn count(&self, decision: AdmissionDecision) -> usize {
        self.decisions.get(&decision).copied().unwrap_or(0)
    }
}

impl std::fmt::Display for Tally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Flood Report ===")?;
        writeln!(f, "Total Requests:     {}", self.total())?;
        writeln!(f, "Admitted:           {}", self.admitted())?;
        writeln!(f, "Rejected (IP):      {}", self.rejected_by(RejectedBy::Ip))?;
        writeln!(f, "Rejected (Session): {}", self.rejected_by(RejectedBy::Session))?;
        writeln!(f, "Max Admitted / IP:  {}", self.max_admitted_per_ip())?;
        Ok(())
    }
}

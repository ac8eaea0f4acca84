// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for flood simulation.

use admission_gate::SessionId;
use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Generate a pool of session identifiers.
pub fn generate_sessions(count: usize) -> Vec<SessionId> {
    (0..count)
        .map(|i| SessionId::new(format!("session-{:04}", i)))
        .collect()
}

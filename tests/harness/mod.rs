// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for admission gate flood simulation.
//!
//! This module provides utilities for replaying request floods against the
//! pipeline on a synthetic clock and tallying the decisions.

pub mod floods;
pub mod generators;
pub mod tally;

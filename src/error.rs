// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for admission gate startup.
//!
//! Admission itself never fails; only loading and validating configuration does.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ConfigError>;

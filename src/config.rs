// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the admission gate.
//!
//! Defaults match the limits the blog API has always shipped with:
//! 20 requests per 20 seconds for both gates and a 45 minute IP sweep.

use crate::error::{ConfigError, Result};
use crate::sweeper::MAX_PERIOD;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Paths served by the operational handlers. The metrics path may not reuse them.
pub const RESERVED_PATHS: [&str; 3] = ["/health", "/healthz", "/check"];

/// Configuration for the admission gate service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Per-IP fixed window gate
    #[serde(default)]
    pub ip_gate: GateConfig,

    /// Per-session allotment gate
    #[serde(default)]
    pub session_gate: GateConfig,

    /// IP state eviction
    #[serde(default)]
    pub sweeper: SweeperConfig,

    /// Where to find the session identifier on a request
    #[serde(default)]
    pub session: SessionConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Quota for one admission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Requests admitted per window (default: 20)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 20)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

/// Eviction sweeper configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Seconds between full clears of IP state (default: 2700)
    #[serde(default = "default_sweep_period_secs")]
    pub period_secs: u64,

    /// Seconds between drops of expired session allotments (default: 60)
    #[serde(default = "default_session_prune_secs")]
    pub session_prune_secs: u64,
}

/// Session identifier lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Header carrying the session id (default: x-session-id)
    #[serde(default = "default_session_header")]
    pub header: String,

    /// Cookie carrying the session id (default: SESSION)
    #[serde(default = "default_session_cookie")]
    pub cookie: String,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_requests() -> u32 {
    20
}

fn default_window_secs() -> u64 {
    20
}

fn default_sweep_period_secs() -> u64 {
    45 * 60
}

fn default_session_prune_secs() -> u64 {
    60
}

fn default_session_header() -> String {
    "x-session-id".to_string()
}

fn default_session_cookie() -> String {
    "SESSION".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            ip_gate: GateConfig::default(),
            session_gate: GateConfig::default(),
            sweeper: SweeperConfig::default(),
            session: SessionConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            period_secs: default_sweep_period_secs(),
            session_prune_secs: default_session_prune_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            header: default_session_header(),
            cookie: default_session_cookie(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl GateConfig {
    /// Get the window duration
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl SweeperConfig {
    /// Get the sweep period
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    /// Get the session pruning period
    pub fn session_prune_period(&self) -> Duration {
        Duration::from_secs(self.session_prune_secs)
    }
}

impl Config {
    /// Load configuration from `CONFIG_FILE` (if set) and the process environment.
    ///
    /// Environment variables win over file values:
    ///
    /// - `BIND_ADDR`
    /// - `IP_MAX_REQUESTS`, `IP_WINDOW_SECS`
    /// - `SESSION_MAX_REQUESTS`, `SESSION_WINDOW_SECS`
    /// - `SWEEP_PERIOD_SECS`, `SESSION_PRUNE_SECS`
    /// - `SESSION_HEADER`, `SESSION_COOKIE`
    /// - `METRICS_ENABLED`
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("CONFIG_FILE") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file. Missing sections fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply overrides from a key lookup (normally the environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("BIND_ADDR") {
            self.bind_addr = addr;
        }
        override_parsed(&lookup, "IP_MAX_REQUESTS", &mut self.ip_gate.max_requests)?;
        override_parsed(&lookup, "IP_WINDOW_SECS", &mut self.ip_gate.window_secs)?;
        override_parsed(
            &lookup,
            "SESSION_MAX_REQUESTS",
            &mut self.session_gate.max_requests,
        )?;
        override_parsed(
            &lookup,
            "SESSION_WINDOW_SECS",
            &mut self.session_gate.window_secs,
        )?;
        override_parsed(&lookup, "SWEEP_PERIOD_SECS", &mut self.sweeper.period_secs)?;
        override_parsed(
            &lookup,
            "SESSION_PRUNE_SECS",
            &mut self.sweeper.session_prune_secs,
        )?;
        if let Some(header) = lookup("SESSION_HEADER") {
            self.session.header = header;
        }
        if let Some(cookie) = lookup("SESSION_COOKIE") {
            self.session.cookie = cookie;
        }
        override_parsed(&lookup, "METRICS_ENABLED", &mut self.metrics.enabled)?;
        Ok(())
    }

    /// Reject configurations the gates cannot run with.
    ///
    /// A zero `max_requests` is allowed; it rejects everything.
    pub fn validate(&self) -> Result<()> {
        self.bind_addr.parse::<SocketAddr>().map_err(|_| ConfigError::Invalid {
            key: "bind_addr",
            value: self.bind_addr.clone(),
        })?;
        if self.ip_gate.window_secs == 0 {
            return Err(ConfigError::Validation("ip_gate.window_secs must be > 0".into()));
        }
        if self.session_gate.window_secs == 0 {
            return Err(ConfigError::Validation(
                "session_gate.window_secs must be > 0".into(),
            ));
        }
        check_period("sweeper.period_secs", self.sweeper.period_secs)?;
        check_period("sweeper.session_prune_secs", self.sweeper.session_prune_secs)?;
        if self.session.header.trim().is_empty() && self.session.cookie.trim().is_empty() {
            return Err(ConfigError::Validation(
                "session.header and session.cookie cannot both be empty".into(),
            ));
        }
        if !self.metrics.path.starts_with('/')
            || RESERVED_PATHS.contains(&self.metrics.path.as_str())
        {
            return Err(ConfigError::Invalid {
                key: "metrics.path",
                value: self.metrics.path.clone(),
            });
        }
        Ok(())
    }
}

fn check_period(key: &str, secs: u64) -> Result<()> {
    if secs == 0 || secs > MAX_PERIOD.as_secs() {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and {}",
            key,
            MAX_PERIOD.as_secs()
        )));
    }
    Ok(())
}

fn override_parsed<F, T>(lookup: &F, key: &'static str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.ip_gate.max_requests, 20);
        assert_eq!(config.ip_gate.window(), Duration::from_secs(20));
        assert_eq!(config.session_gate, config.ip_gate);
        assert_eq!(config.sweeper.period(), Duration::from_secs(45 * 60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("IP_MAX_REQUESTS", "5"),
                ("SESSION_WINDOW_SECS", " 30 "),
                ("SWEEP_PERIOD_SECS", "60"),
                ("SESSION_COOKIE", "JSESSIONID"),
                ("METRICS_ENABLED", "false"),
            ]))
            .unwrap();

        assert_eq!(config.ip_gate.max_requests, 5);
        assert_eq!(config.ip_gate.window_secs, 20);
        assert_eq!(config.session_gate.window_secs, 30);
        assert_eq!(config.sweeper.period_secs, 60);
        assert_eq!(config.session.cookie, "JSESSIONID");
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_malformed_override_is_an_error() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup(&[("IP_WINDOW_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "IP_WINDOW_SECS", .. }));
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.ip_gate.window_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sweeper.period_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.bind_addr = "not-an-addr".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.metrics.path = "metrics".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.session_gate.max_requests = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_metrics_path_cannot_shadow_operational_routes() {
        for path in RESERVED_PATHS {
            let mut config = Config::default();
            config.metrics.path = path.to_string();
            let err = config.validate().unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { key: "metrics.path", .. }));
        }

        let mut config = Config::default();
        config.metrics.path = "/internal/metrics".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_periods_are_bounded() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[("SWEEP_PERIOD_SECS", "18446744073709551615")]))
            .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = Config::default();
        config.sweeper.period_secs = MAX_PERIOD.as_secs();
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.sweeper.session_prune_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json() {
        let config: Config =
            serde_json::from_str(r#"{"ip_gate": {"max_requests": 3}}"#).unwrap();
        assert_eq!(config.ip_gate.max_requests, 3);
        assert_eq!(config.ip_gate.window_secs, 20);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }
}

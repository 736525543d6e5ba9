//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from the TOML config file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default runtime directory for marker files and the persisted route table.
pub const DEFAULT_RUNTIME_PATH: &str = "/var/run/homegate";

/// Default location of the web UI assets.
pub const DEFAULT_WWW_PATH: &str = "/var/lib/homegate/www";

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Settings shared with co-located services.
    pub common: CommonConfig,

    /// Data-plane listener settings.
    pub gateway: ListenerConfig,

    /// Hot-reload protocol tuning.
    pub reload: ReloadConfig,

    /// Control-plane credentials.
    pub admin: AdminConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Settings shared with co-located services.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CommonConfig {
    /// Directory holding pid/url marker files and `routes.json`.
    pub runtime_path: PathBuf,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            runtime_path: PathBuf::from(DEFAULT_RUNTIME_PATH),
        }
    }
}

/// Data-plane listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Public port. Empty means "pick the first free port at startup".
    pub port: String,

    /// Directory served by the static UI listener.
    pub www_path: PathBuf,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            www_path: PathBuf::from(DEFAULT_WWW_PATH),
        }
    }
}

/// Tuning for the make-before-break listener swap.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReloadConfig {
    /// Liveness path probed on a candidate listener.
    pub probe_path: String,

    /// Per-attempt probe timeout in seconds.
    pub probe_timeout_secs: u64,

    /// Number of probe attempts before the candidate is abandoned.
    pub probe_attempts: u32,

    /// Pause between probe attempts in milliseconds.
    pub probe_pause_ms: u64,

    /// Delay before the superseded listener starts draining, in milliseconds.
    pub drain_grace_ms: u64,
}

impl ReloadConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn probe_pause(&self) -> Duration {
        Duration::from_millis(self.probe_pause_ms)
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_millis(self.drain_grace_ms)
    }
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            probe_path: "/ping".to_string(),
            probe_timeout_secs: 5,
            probe_attempts: 10,
            probe_pause_ms: 1000,
            drain_grace_ms: 1000,
        }
    }
}

/// Control-plane credential configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Bearer token accepted from non-loopback callers. `None` means only
    /// loopback callers may mutate routes or the port.
    pub api_key: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_uses_defaults() {
        let config: GatewayConfig = toml::from_str("[gateway]\nport = \"8080\"\n").unwrap();
        assert_eq!(config.gateway.port, "8080");
        assert_eq!(config.common.runtime_path, PathBuf::from(DEFAULT_RUNTIME_PATH));
        assert_eq!(config.reload.probe_attempts, 10);
        assert_eq!(config.reload.probe_timeout(), Duration::from_secs(5));
        assert_eq!(config.reload.drain_grace(), Duration::from_secs(1));
    }

    #[test]
    fn empty_port_is_default() {
        let config = GatewayConfig::default();
        assert!(config.gateway.port.is_empty());
        assert!(config.admin.api_key.is_none());
    }
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports, probe budget, addresses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with a configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid port {0:?}: expected a number between 1 and 65535")]
    InvalidPort(String),

    #[error("reload.probe_attempts must be at least 1")]
    NoProbeAttempts,

    #[error("reload.probe_timeout_secs must be at least 1")]
    ZeroProbeTimeout,

    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),

    #[error("common.runtime_path must not be empty")]
    EmptyRuntimePath,
}

/// Parse a non-empty port string as given over the control plane or in the
/// config file.
pub fn validate_port(port: &str) -> Result<u16, ValidationError> {
    match port.trim().parse::<u16>() {
        Ok(p) if p != 0 => Ok(p),
        _ => Err(ValidationError::InvalidPort(port.to_string())),
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.gateway.port.is_empty() {
        if let Err(e) = validate_port(&config.gateway.port) {
            errors.push(e);
        }
    }

    if config.common.runtime_path.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyRuntimePath);
    }

    if config.reload.probe_attempts == 0 {
        errors.push(ValidationError::NoProbeAttempts);
    }

    if config.reload.probe_timeout_secs == 0 {
        errors.push(ValidationError::ZeroProbeTimeout);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_parsing() {
        assert_eq!(validate_port("8080"), Ok(8080));
        assert_eq!(validate_port(" 81 "), Ok(81));
        assert!(validate_port("").is_err());
        assert!(validate_port("0").is_err());
        assert!(validate_port("70000").is_err());
        assert!(validate_port("eighty").is_err());
    }

    #[test]
    fn collects_every_error() {
        let mut config = GatewayConfig::default();
        config.gateway.port = "abc".into();
        config.reload.probe_attempts = 0;
        config.reload.probe_timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }
}

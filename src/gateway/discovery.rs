//! Data-plane port auto-discovery.

use std::net::{Ipv4Addr, TcpListener};

use crate::gateway::GatewayError;

/// Ports tried in order when no port is configured: 80–89, then 8080–8089.
pub fn default_candidates() -> Vec<u16> {
    (80..90).chain(8080..8090).collect()
}

/// Return the first candidate that can be bound on the wildcard interface.
///
/// Each probe binds and immediately closes a throwaway listener, so the
/// port is free again when this returns.
pub fn discover_port(candidates: &[u16]) -> Result<u16, GatewayError> {
    for &port in candidates {
        tracing::info!(port, "Checking if port is available");
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)) {
            Ok(listener) => {
                drop(listener);
                tracing::info!(port, "Port is available");
                return Ok(port);
            }
            Err(e) => tracing::debug!(port, error = %e, "Port unavailable"),
        }
    }
    Err(GatewayError::NoPortAvailable(candidates.to_vec()))
}

//! Liveness probing of a candidate listener.
//!
//! # Responsibilities
//! - Probe the liveness path over HTTP with a per-attempt timeout
//! - Retry a bounded number of times with a fixed pause
//! - Abort between attempts once root shutdown has fired

use axum::body::Body;
use axum::http::{header, Request};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::time;

use crate::config::ReloadConfig;
use crate::gateway::GatewayError;
use crate::lifecycle::Shutdown;

/// HTTP liveness probe for candidate listeners.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: Client<HttpConnector, Body>,
    path: String,
    timeout: Duration,
    attempts: u32,
    pause: Duration,
}

impl HealthProbe {
    pub fn new(config: &ReloadConfig) -> Self {
        // No pooling: an idle keep-alive connection would hold up the
        // candidate's graceful shutdown.
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(HttpConnector::new());

        Self {
            client,
            path: config.probe_path.clone(),
            timeout: config.probe_timeout(),
            attempts: config.probe_attempts.max(1),
            pause: config.probe_pause(),
        }
    }

    /// Probe `addr` until it answers with a success status.
    pub async fn wait_healthy(&self, addr: SocketAddr, shutdown: &Shutdown) -> Result<(), GatewayError> {
        let uri = format!("http://{}{}", probe_addr(addr), self.path);

        for attempt in 1..=self.attempts {
            if shutdown.is_triggered() {
                return Err(GatewayError::Cancelled);
            }

            tracing::info!(url = %uri, attempt, max_attempts = self.attempts, "Checking if gateway is running");
            if self.check(&uri).await {
                return Ok(());
            }

            if attempt < self.attempts {
                tokio::select! {
                    _ = time::sleep(self.pause) => {}
                    _ = shutdown.wait() => return Err(GatewayError::Cancelled),
                }
            }
        }

        Err(GatewayError::HealthCheckTimeout {
            addr,
            attempts: self.attempts,
        })
    }

    async fn check(&self, uri: &str) -> bool {
        let request = match Request::builder()
            .method("GET")
            .uri(uri)
            .header(header::USER_AGENT, "homegate-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build health check request");
                return false;
            }
        };

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::warn!(url = %uri, status = %response.status(), "Health check failed: non-success status");
                }
                success
            }
            Ok(Err(e)) => {
                tracing::warn!(url = %uri, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(url = %uri, "Health check failed: timeout");
                false
            }
        }
    }
}

/// Wildcard listeners are probed over loopback of the same family.
fn probe_addr(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => SocketAddr::new(Ipv4Addr::LOCALHOST.into(), addr.port()),
        IpAddr::V6(ip) if ip.is_unspecified() => SocketAddr::new(Ipv6Addr::LOCALHOST.into(), addr.port()),
        _ => addr,
    }
}

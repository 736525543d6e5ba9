//! Zero-downtime hot reload of the data-plane listener.

use arc_swap::ArcSwapOption;
use axum::Router;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::config::ReloadConfig;
use crate::gateway::probe::HealthProbe;
use crate::gateway::{GatewayError, GatewayHandle};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Owns the active data-plane listener and swaps it on port changes.
#[derive(Debug)]
pub struct GatewayReloader {
    active: ArcSwapOption<GatewayHandle>,
    reload_lock: Mutex<()>,
    app: Router,
    probe: HealthProbe,
    drain_grace: Duration,
    shutdown: Shutdown,
}

impl GatewayReloader {
    /// `app` is the dispatch router attached to every listener.
    pub fn new(app: Router, config: &ReloadConfig, shutdown: Shutdown) -> Self {
        Self {
            active: ArcSwapOption::empty(),
            reload_lock: Mutex::new(()),
            app,
            probe: HealthProbe::new(config),
            drain_grace: config.drain_grace(),
            shutdown,
        }
    }

    /// Address of the listener currently serving traffic.
    pub fn active_addr(&self) -> Option<SocketAddr> {
        self.active.load().as_ref().map(|handle| handle.addr())
    }

    /// Move the data plane to `port` without dropping service.
    ///
    /// On any failure before promotion the previous listener keeps serving
    /// and the candidate is closed. Returns the address now serving.
    pub async fn reload(&self, port: &str) -> Result<SocketAddr, GatewayError> {
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| GatewayError::InvalidPort(port.to_string()))?;

        let _guard = self.reload_lock.lock().await;
        let previous = self.active.load_full();

        // Binding the active port again would fail with address-in-use.
        if let Some(current) = previous.as_ref().filter(|h| port != 0 && h.addr().port() == port) {
            tracing::info!(address = %current.addr(), "Port is the same as current running gateway - no change is required");
            return Ok(current.addr());
        }

        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map_err(|source| GatewayError::Bind { port, source })?;
        let addr = listener
            .local_addr()
            .map_err(|source| GatewayError::Bind { port, source })?;

        if previous.as_ref().is_some_and(|h| h.addr() == addr) {
            tracing::info!(address = %addr, "Gateway already listening on this address - no change is required");
            return Ok(addr);
        }

        let candidate = GatewayHandle::serve(listener, self.app.clone(), self.shutdown.clone())
            .map_err(|source| GatewayError::Bind { port, source })?;

        if let Err(e) = self.probe.wait_healthy(addr, &self.shutdown).await {
            tracing::error!(address = %addr, error = %e, "New gateway failed health check, keeping previous gateway");
            close(&candidate).await;
            metrics::record_reload("failed");
            return Err(e);
        }

        self.active.store(Some(Arc::new(candidate)));
        tracing::info!(address = %addr, "New gateway is listening");
        metrics::record_reload("promoted");

        if let Some(old) = previous {
            let grace = self.drain_grace;
            tokio::spawn(async move {
                tracing::info!(address = %old.addr(), grace_ms = grace.as_millis() as u64, "Stopping previous gateway after grace delay");
                tokio::time::sleep(grace).await;
                if let Err(e) = old.shutdown().await {
                    tracing::error!(address = %old.addr(), error = %e, "Error when stopping previous gateway");
                }
            });
        }

        Ok(addr)
    }

    /// Stop the active listener at process shutdown.
    pub async fn close(&self) {
        if let Some(handle) = self.active.swap(None) {
            close(&handle).await;
        }
    }
}

async fn close(handle: &GatewayHandle) {
    if let Err(e) = handle.shutdown().await {
        tracing::error!(address = %handle.addr(), error = %e, "Error when stopping gateway");
    }
}

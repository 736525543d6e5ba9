//! A serving data-plane listener.

use axum::Router;
use parking_lot::Mutex;
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

/// A listener accepting data-plane traffic on its own task.
///
/// The listener stops accepting on [`GatewayHandle::shutdown`], on root
/// shutdown, or when the handle is dropped; in-flight requests always run to
/// completion.
#[derive(Debug)]
pub struct GatewayHandle {
    addr: SocketAddr,
    stop_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl GatewayHandle {
    /// Start serving `app` on `listener`.
    pub fn serve(listener: TcpListener, app: Router, shutdown: Shutdown) -> io::Result<Self> {
        let addr = listener.local_addr()?;
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let stopped = async move {
            tokio::select! {
                _ = stop_rx.wait_for(|stop| *stop) => {}
                _ = shutdown.wait() => {}
            }
        };

        let task = tokio::spawn(async move {
            tracing::info!(address = %addr, "Gateway listener serving");
            let service = app.into_make_service_with_connect_info::<SocketAddr>();
            match axum::serve(listener, service).with_graceful_shutdown(stopped).await {
                Ok(()) => tracing::info!(address = %addr, "Gateway listener stopped"),
                Err(e) => tracing::error!(address = %addr, error = %e, "Gateway listener failed"),
            }
        });

        Ok(Self {
            addr,
            stop_tx,
            task: Mutex::new(Some(task)),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting and wait for in-flight requests, with no deadline.
    pub async fn shutdown(&self) -> Result<(), tokio::task::JoinError> {
        self.stop_tx.send_replace(true);
        let task = self.task.lock().take();
        match task {
            Some(task) => task.await,
            None => Ok(()),
        }
    }
}

//! Readiness handshake between the control plane and the data plane.
//!
//! Each listener startup path owns one [`ReadyGate`] and fires it once it is
//! accepting connections. A single waiter task notifies the supervisor after
//! both gates have fired. Gates are consumed by `fire`, so neither can fire
//! twice, and a gate dropped without firing means readiness is never
//! reported.

use std::io;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// One-shot readiness signal for a single subsystem.
#[derive(Debug)]
pub struct ReadyGate {
    name: &'static str,
    tx: oneshot::Sender<()>,
}

impl ReadyGate {
    pub fn fire(self) {
        tracing::debug!(gate = self.name, "Readiness gate fired");
        if self.tx.send(()).is_err() {
            tracing::debug!(gate = self.name, "Readiness waiter already gone");
        }
    }
}

/// Waiting side of both readiness gates.
#[derive(Debug)]
pub struct Readiness {
    control_plane: oneshot::Receiver<()>,
    data_plane: oneshot::Receiver<()>,
}

impl Readiness {
    /// Returns the waiter plus the control-plane and data-plane gates.
    pub fn new() -> (Self, ReadyGate, ReadyGate) {
        let (control_tx, control_rx) = oneshot::channel();
        let (data_tx, data_rx) = oneshot::channel();
        (
            Self {
                control_plane: control_rx,
                data_plane: data_rx,
            },
            ReadyGate {
                name: "control-plane",
                tx: control_tx,
            },
            ReadyGate {
                name: "data-plane",
                tx: data_tx,
            },
        )
    }

    /// Wait for both gates. Returns `false` if either was dropped unfired.
    pub async fn wait(self) -> bool {
        let (control, data) = tokio::join!(self.control_plane, self.data_plane);
        control.is_ok() && data.is_ok()
    }

    /// Spawn the waiter that notifies the supervisor exactly once.
    ///
    /// The task is detached; if readiness is never reached it simply ends
    /// with the runtime.
    pub fn spawn_notifier<N>(self, notifier: N) -> JoinHandle<bool>
    where
        N: ReadinessNotifier + 'static,
    {
        tokio::spawn(async move {
            if !self.wait().await {
                tracing::warn!("Gateway never became ready, skipping supervisor notification");
                return false;
            }

            match notifier.notify_ready() {
                Ok(true) => {
                    tracing::info!("Notified supervisor that gateway is ready");
                    true
                }
                Ok(false) => {
                    tracing::info!("Not running under a supervisor, readiness not reported");
                    true
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to notify supervisor that gateway is ready");
                    false
                }
            }
        })
    }
}

/// External readiness sink (process supervisor).
pub trait ReadinessNotifier: Send + Sync {
    /// Report readiness. `Ok(false)` means no supervisor is listening.
    fn notify_ready(&self) -> io::Result<bool>;
}

/// systemd `sd_notify` readiness over `$NOTIFY_SOCKET`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemdNotifier;

impl ReadinessNotifier for SystemdNotifier {
    #[cfg(unix)]
    fn notify_ready(&self) -> io::Result<bool> {
        use std::os::unix::net::UnixDatagram;

        let Some(socket_path) = std::env::var_os("NOTIFY_SOCKET") else {
            return Ok(false);
        };
        let socket = UnixDatagram::unbound()?;
        let message = b"READY=1";

        #[cfg(target_os = "linux")]
        {
            use std::os::linux::net::SocketAddrExt;
            use std::os::unix::ffi::OsStrExt;
            use std::os::unix::net::SocketAddr;

            if let Some(name) = socket_path.as_bytes().strip_prefix(b"@") {
                let addr = SocketAddr::from_abstract_name(name)?;
                socket.send_to_addr(message, &addr)?;
                return Ok(true);
            }
        }

        socket.send_to(message, &socket_path)?;
        Ok(true)
    }

    #[cfg(not(unix))]
    fn notify_ready(&self) -> io::Result<bool> {
        Ok(false)
    }
}

//! Data-plane listener management and the hot-reload protocol.
//!
//! # Data Flow
//! ```text
//! committed port change (State observer)
//!     → reloader.rs (serialize attempts, short-circuit unchanged port)
//!     → bind candidate listener
//!     → handle.rs (serve candidate on its own task)
//!     → probe.rs (liveness probe with bounded retries)
//!     → promote: atomic publish of the new handle
//!     → drain predecessor after a grace delay
//!
//! Startup with no configured port:
//!     discovery.rs (first free of 80–89, 8080–8089) → State → reloader
//! ```
//!
//! # States
//! ```text
//! Idle ─▶ CandidateBound ─▶ HealthChecking ─▶ Promoted ─┐
//!              ▲                  │                      │
//!              │   failure: candidate closed,            │
//!              │   previous handle untouched             │
//!              └─────────────────────────────────────────┘
//! ```
//!
//! # Design Decisions
//! - Make-before-break: promotion happens before the predecessor drains
//! - The active handle is an `ArcSwapOption`, so readers never block on a swap
//! - Reload attempts are serialized; reads of the active address are not

pub mod discovery;
pub mod handle;
pub mod probe;
pub mod reloader;

use std::net::SocketAddr;
use thiserror::Error;

pub use handle::GatewayHandle;
pub use reloader::GatewayReloader;

/// Errors from a hot-reload attempt or port discovery.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid gateway port {0:?}")]
    InvalidPort(String),

    #[error("failed to bind gateway port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("gateway at {addr} did not become healthy after {attempts} attempts")]
    HealthCheckTimeout { addr: SocketAddr, attempts: u32 },

    #[error("no port available for gateway to use (tried {0:?})")]
    NoPortAvailable(Vec<u16>),

    #[error("gateway reload cancelled by shutdown")]
    Cancelled,
}

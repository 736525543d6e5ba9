//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Runtime dir → State → RouteTable → control plane → data plane → static UI
//!
//! Readiness (readiness.rs):
//!     control-plane gate + data-plane gate → one supervisor notification
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → root signal → stop accepting → drain → remove markers
//! ```
//!
//! # Design Decisions
//! - Ordered startup: control plane registers itself before the data plane
//! - Shutdown is a sticky signal, observable between retry attempts
//! - Readiness never blocks shutdown

pub mod readiness;
pub mod runtime_files;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use readiness::{Readiness, ReadinessNotifier, ReadyGate, SystemdNotifier};
pub use shutdown::Shutdown;
pub use startup::{Gateway, GatewayOptions, StartupError};

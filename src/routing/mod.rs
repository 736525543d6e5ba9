//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Control plane: CreateRoute {path, target}
//!     → table.rs (validate target, update both mappings under one lock)
//!     → proxy.rs (build the derived handler for that path)
//!     → store.rs (rewrite routes.json in full)
//!
//! Data plane: incoming request path
//!     → table.rs (longest registered prefix)
//!     → proxy.rs (forward to backend, stream response back)
//!     → or NoMatch (caller answers 404)
//! ```
//!
//! # Design Decisions
//! - Paths are plain prefixes, no patterns
//! - Longest prefix wins, so `/ab` never shadows `/abcd`
//! - Handlers are derived state and never persisted

pub mod proxy;
pub mod store;
pub mod table;

pub use proxy::ReverseProxy;
pub use table::{Route, RouteError, RouteTable};

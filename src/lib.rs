//! Embedded API gateway for a home-server platform.
//!
//! One public data-plane listener forwards requests by longest path prefix
//! to internal services; a loopback control-plane API registers routes and
//! moves the public port at runtime without dropping traffic.

pub mod admin;
pub mod config;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::GatewayConfig;
pub use gateway::GatewayReloader;
pub use lifecycle::{Gateway, GatewayOptions, Shutdown};
pub use routing::{Route, RouteTable};

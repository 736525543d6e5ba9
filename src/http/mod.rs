//! HTTP surfaces served by the gateway besides the control plane.
//!
//! # Data Flow
//! ```text
//! data-plane listener (public port, hot-swapped)
//!     → server.rs (request ID, tracing, /ping)
//!     → routing::RouteTable (longest prefix)
//!     → routing::ReverseProxy (forward, stream back)
//!
//! static UI listener (loopback, registered as route "/")
//!     → static_files.rs (ServeDir over www_path)
//! ```

pub mod server;
pub mod static_files;

pub use server::{data_plane_router, DataPlaneState, PING_PATH};
pub use static_files::static_router;

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (create defaults if missing, parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated)
//!     → state.rs (mutable runtime values seeded from the config)
//!
//! On port change (control plane or auto-discovery):
//!     state.rs commits the new port
//!     → save hook rewrites the config file
//!     → observers run in order (hot-reload protocol)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Runtime state is an explicit object threaded through constructors

pub mod loader;
pub mod schema;
pub mod state;
pub mod validation;

pub use loader::ConfigError;
pub use schema::{GatewayConfig, ListenerConfig, ReloadConfig};
pub use state::{State, StateError, StateSnapshot};

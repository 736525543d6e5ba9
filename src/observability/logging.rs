//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Honor `RUST_LOG`, falling back to the configured level
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - The configured level applies to this crate and tower_http only;
//!   dependencies stay at warn

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the default filter directive for a configured log level.
pub fn default_directive(level: &str) -> String {
    format!("warn,homegate={level},tower_http={level}")
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_scopes_level() {
        assert_eq!(default_directive("debug"), "warn,homegate=debug,tower_http=debug");
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logging("info");
        init_logging("debug");
    }
}

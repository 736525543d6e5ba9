//! homegate: embedded API gateway (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────────┐
//!                         │                     HOMEGATE                      │
//!                         │                                                   │
//!   Client Request        │  ┌────────────┐    ┌──────────────┐               │
//!   ──────────────────────┼─▶│ data plane │───▶│ route table  │──┐            │
//!   (public port)         │  │ (hot-swap) │    │longest prefix│  │            │
//!                         │  └─────▲──────┘    └──────▲───────┘  ▼            │
//!                         │        │                  │   ┌──────────────┐    │
//!                         │  ┌─────┴──────┐    ┌──────┴─┐ │reverse proxy │────┼──▶ Backend
//!                         │  │  reloader  │◀───│ state  │ └──────────────┘    │
//!                         │  │probe+drain │    │observers│                     │
//!                         │  └────────────┘    └────▲───┘                     │
//!   Local services        │  ┌────────────────┐     │                         │
//!   ──────────────────────┼─▶│ control plane  │─────┘  (routes, port)         │
//!   (loopback API)        │  └────────────────┘                               │
//!                         └───────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use homegate::config::loader::load_or_create;
use homegate::lifecycle::startup::run;
use homegate::lifecycle::{GatewayOptions, SystemdNotifier};
use homegate::observability::{logging, metrics};

/// Command-line arguments for the gateway.
#[derive(Debug, Parser)]
#[command(name = "homegate", version, about = "Embedded API gateway", long_about = None)]
struct Args {
    /// Path to the TOML config file (created with defaults if missing)
    #[arg(short, long, default_value = "/etc/homegate/gateway.toml")]
    config: PathBuf,

    /// Directory holding the web UI assets
    #[arg(short, long)]
    www_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_or_create(&args.config)?;
    if let Some(www_path) = args.www_path {
        config.gateway.www_path = www_path;
    }

    logging::init_logging(&config.observability.log_level);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "homegate starting");
    tracing::info!(
        config = %args.config.display(),
        runtime_path = %config.common.runtime_path.display(),
        port = %config.gateway.port,
        www_path = %config.gateway.www_path.display(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let options = GatewayOptions::new(config, Some(args.config));
    if let Err(e) = run(options, SystemdNotifier).await {
        tracing::error!(error = %e, "Failed to start gateway");
        return Err(e.into());
    }

    Ok(())
}

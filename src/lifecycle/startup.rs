//! Startup orchestration.
//!
//! # Responsibilities
//! - Prepare the runtime directory and marker files
//! - Build state, route table and reloader, threaded explicitly
//! - Start the control plane, data plane and static UI listeners
//! - Report readiness once control and data planes accept connections
//! - Tear everything down in order on shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The data plane only starts after the control plane has registered
//!   itself as a route
//! - Shutdown order: stop accepting everywhere, drain, remove marker files

use parking_lot::Mutex;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::admin::{setup_admin_router, AdminState, PORT_PATH};
use crate::config::loader::{save_config, ConfigError};
use crate::config::state::BoxError;
use crate::config::{GatewayConfig, State, StateError};
use crate::gateway::discovery::{default_candidates, discover_port};
use crate::gateway::{GatewayError, GatewayReloader};
use crate::http::{data_plane_router, static_router};
use crate::lifecycle::readiness::{Readiness, ReadinessNotifier};
use crate::lifecycle::runtime_files::{RuntimeFiles, MANAGEMENT_URL_FILENAME, STATIC_URL_FILENAME};
use crate::lifecycle::{signals, Shutdown};
use crate::routing::{Route, RouteError, RouteTable};

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("runtime directory: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("failed to start {listener} listener: {source}")]
    Listener {
        listener: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Everything needed to run one gateway process.
pub struct GatewayOptions {
    pub config: GatewayConfig,
    /// Where the save hook rewrites the config. `None` disables persistence.
    pub config_path: Option<PathBuf>,
    /// Ports tried when `config.gateway.port` is empty.
    pub candidate_ports: Vec<u16>,
}

impl GatewayOptions {
    pub fn new(config: GatewayConfig, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
            candidate_ports: default_candidates(),
        }
    }
}

/// A started gateway. Dropping it does not stop anything; call
/// [`Gateway::run_until_shutdown`].
pub struct Gateway {
    state: Arc<State>,
    table: Arc<RouteTable>,
    reloader: Arc<GatewayReloader>,
    runtime_files: RuntimeFiles,
    shutdown: Shutdown,
    management_addr: SocketAddr,
    static_addr: SocketAddr,
    tasks: Vec<JoinHandle<()>>,
}

impl Gateway {
    /// Start every listener. Returns once the data plane is promoted.
    pub async fn start<N>(options: GatewayOptions, shutdown: Shutdown, notifier: N) -> Result<Self, StartupError>
    where
        N: ReadinessNotifier + 'static,
    {
        let GatewayOptions {
            config,
            config_path,
            candidate_ports,
        } = options;

        let runtime_files = RuntimeFiles::prepare(&config.common.runtime_path).map_err(StartupError::Runtime)?;
        let pid_file = runtime_files.write_pid().map_err(StartupError::Runtime)?;
        tracing::debug!(
            runtime_path = %runtime_files.dir().display(),
            pid_file = %pid_file.display(),
            "Runtime directory ready"
        );

        let state = Arc::new(build_state(&config, config_path));
        let table = Arc::new(RouteTable::load(state.clone()));

        let (readiness, control_gate, data_gate) = Readiness::new();
        readiness.spawn_notifier(notifier);

        let mut tasks = Vec::new();

        // Control plane
        let (management_addr, task) = serve_loopback(
            "management",
            setup_admin_router(AdminState {
                table: table.clone(),
                api_key: config.admin.api_key.clone(),
            }),
            shutdown.clone(),
        )
        .await?;
        tasks.push(task);
        let management_url = format!("http://{management_addr}");
        let url_file = runtime_files
            .write_address(MANAGEMENT_URL_FILENAME, &management_url)
            .map_err(StartupError::Runtime)?;
        tracing::info!(address = %management_addr, filepath = %url_file.display(), "Management service is listening");
        table.create_route(Route::new(PORT_PATH, management_url))?;
        control_gate.fire();

        // Data plane
        let reloader = Arc::new(GatewayReloader::new(
            data_plane_router(table.clone()),
            &config.reload,
            shutdown.clone(),
        ));
        {
            let reloader = reloader.clone();
            state.on_gateway_port_change(move |port| {
                let reloader = reloader.clone();
                async move {
                    reloader.reload(&port).await.map(|_| ()).map_err(BoxError::from)
                }
            });
        }

        if state.gateway_port().is_empty() {
            let port = discover_port(&candidate_ports)?;
            state.set_gateway_port(port.to_string()).await?;
        } else {
            reloader.reload(&state.gateway_port()).await?;
        }
        data_gate.fire();

        // Static UI
        let (static_addr, task) =
            serve_loopback("static", static_router(&state.www_path()), shutdown.clone()).await?;
        tasks.push(task);
        let static_url = format!("http://{static_addr}");
        let url_file = runtime_files
            .write_address(STATIC_URL_FILENAME, &static_url)
            .map_err(StartupError::Runtime)?;
        table.create_route(Route::new("/", static_url))?;
        tracing::info!(address = %static_addr, filepath = %url_file.display(), "Static web service is listening");

        Ok(Self {
            state,
            table,
            reloader,
            runtime_files,
            shutdown,
            management_addr,
            static_addr,
            tasks,
        })
    }

    pub fn state(&self) -> &Arc<State> {
        &self.state
    }

    pub fn table(&self) -> &Arc<RouteTable> {
        &self.table
    }

    pub fn reloader(&self) -> &Arc<GatewayReloader> {
        &self.reloader
    }

    pub fn management_addr(&self) -> SocketAddr {
        self.management_addr
    }

    pub fn static_addr(&self) -> SocketAddr {
        self.static_addr
    }

    /// Wait for the root shutdown signal, then stop every listener and
    /// remove the marker files.
    pub async fn run_until_shutdown(self) {
        self.shutdown.wait().await;
        tracing::info!("Shutting down gateway");

        self.reloader.close().await;
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Listener task failed");
            }
        }
        self.runtime_files.cleanup();
        tracing::info!("Shutdown complete");
    }
}

/// Start the gateway and serve until SIGINT/SIGTERM.
pub async fn run<N>(options: GatewayOptions, notifier: N) -> Result<(), StartupError>
where
    N: ReadinessNotifier + 'static,
{
    let shutdown = Shutdown::new();
    signals::listen(shutdown.clone());

    let gateway = match Gateway::start(options, shutdown.clone(), notifier).await {
        Ok(gateway) => gateway,
        Err(e) => {
            shutdown.trigger();
            return Err(e);
        }
    };
    gateway.run_until_shutdown().await;
    Ok(())
}

fn build_state(config: &GatewayConfig, config_path: Option<PathBuf>) -> State {
    let state = State::new(
        config.common.runtime_path.clone(),
        config.gateway.port.clone(),
        config.gateway.www_path.clone(),
    );

    let Some(path) = config_path else {
        return state;
    };

    let persisted = Mutex::new(config.clone());
    state.with_save_hook(move |snapshot| {
        let mut config = persisted.lock();
        config.common.runtime_path = snapshot.runtime_path.clone();
        config.gateway.port = snapshot.gateway_port.clone();
        save_config(&path, &config).map_err(|e: ConfigError| BoxError::from(e))
    })
}

/// Bind `127.0.0.1:0` and serve `app` until root shutdown.
async fn serve_loopback(
    listener_name: &'static str,
    app: axum::Router,
    shutdown: Shutdown,
) -> Result<(SocketAddr, JoinHandle<()>), StartupError> {
    let to_err = |source| StartupError::Listener {
        listener: listener_name,
        source,
    };
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.map_err(to_err)?;
    let addr = listener.local_addr().map_err(to_err)?;

    let task = tokio::spawn(async move {
        let service = app.into_make_service_with_connect_info::<SocketAddr>();
        let stopping = shutdown.clone();
        let result = axum::serve(listener, service)
            .with_graceful_shutdown(async move { stopping.wait().await })
            .await;
        if let Err(e) = result {
            tracing::error!(listener = listener_name, error = %e, "Listener failed");
            shutdown.trigger();
        }
    });

    Ok((addr, task))
}

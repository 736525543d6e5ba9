//! Route table: persistent `path → target` mapping with longest-prefix
//! dispatch.
//!
//! # Responsibilities
//! - Validate, store and persist routes (create or overwrite)
//! - Keep a derived `path → proxy handler` mapping in lockstep
//! - Resolve a request path to the handler of its longest registered prefix
//!
//! # Design Decisions
//! - Both mappings live behind one reader/writer lock; they are never
//!   locked separately
//! - Persistence happens under the write lock so concurrent writers cannot
//!   reorder file contents
//! - A failed write is reported but the in-memory change stays
//! - The file write is synchronous and happens while the write lock is
//!   held, so data-plane lookups wait for it. Route changes are rare and
//!   the file is small; `block_in_place` is not used because it panics on
//!   a current-thread runtime

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::config::{State, StateError};
use crate::observability::metrics;
use crate::routing::proxy::{build_client, ProxyClient, ReverseProxy};
use crate::routing::store::{load_routes, save_routes, ROUTES_FILENAME};

/// A single forwarding rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// URL path prefix.
    pub path: String,
    /// Absolute base URL of the backend.
    pub target: String,
}

impl Route {
    pub fn new(path: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            target: target.into(),
        }
    }
}

/// Errors returned by route table mutations.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid path {0:?}: must start with '/'")]
    InvalidPath(String),

    #[error("invalid target {target:?}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("failed to persist routes to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RouteError {
    /// True when the request itself was malformed and nothing changed.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, RouteError::InvalidPath(_) | RouteError::InvalidTarget { .. })
    }
}

/// The two parallel mappings, always locked together.
#[derive(Debug, Default)]
struct RouteMaps {
    targets: HashMap<String, String>,
    proxies: HashMap<String, Arc<ReverseProxy>>,
}

impl RouteMaps {
    fn insert(&mut self, path: String, target: String, proxy: ReverseProxy) {
        self.proxies.insert(path.clone(), Arc::new(proxy));
        self.targets.insert(path, target);
    }
}

/// Shared route table.
#[derive(Debug)]
pub struct RouteTable {
    maps: RwLock<RouteMaps>,
    routes_file: PathBuf,
    client: ProxyClient,
    state: Arc<State>,
}

impl RouteTable {
    /// Load the persisted table from the runtime directory, or start empty.
    pub fn load(state: Arc<State>) -> Self {
        let routes_file = state.runtime_path().join(ROUTES_FILENAME);
        let client = build_client();

        let persisted = match load_routes(&routes_file) {
            Ok(targets) => targets,
            Err(e) => {
                tracing::error!(path = %routes_file.display(), error = %e, "Failed to load routes, starting empty");
                HashMap::new()
            }
        };

        let mut maps = RouteMaps::default();
        for (path, target) in persisted {
            match parse_target(&target) {
                Ok(url) => maps.insert(path, target, ReverseProxy::new(url, client.clone())),
                Err(e) => tracing::error!(path = %path, error = %e, "Skipping persisted route"),
            }
        }

        tracing::info!(routes = maps.targets.len(), path = %routes_file.display(), "Route table loaded");
        metrics::set_route_count(maps.targets.len());

        Self {
            maps: RwLock::new(maps),
            routes_file,
            client,
            state,
        }
    }

    /// Create or overwrite the route for `route.path` and persist the table.
    pub fn create_route(&self, route: Route) -> Result<(), RouteError> {
        if !route.path.starts_with('/') {
            return Err(RouteError::InvalidPath(route.path));
        }
        let url = parse_target(&route.target)?;
        let proxy = ReverseProxy::new(url, self.client.clone());

        let mut maps = self.maps.write();
        maps.insert(route.path.clone(), route.target.clone(), proxy);
        metrics::set_route_count(maps.targets.len());

        tracing::info!(path = %route.path, target = %route.target, "Route registered");

        save_routes(&self.routes_file, &maps.targets).map_err(|source| RouteError::Persistence {
            path: self.routes_file.clone(),
            source,
        })
    }

    /// Every registered route, in no particular order.
    pub fn routes(&self) -> Vec<Route> {
        self.maps
            .read()
            .targets
            .iter()
            .map(|(path, target)| Route::new(path.clone(), target.clone()))
            .collect()
    }

    /// The handler whose path is the longest prefix of `request_path`.
    pub fn resolve_proxy(&self, request_path: &str) -> Option<Arc<ReverseProxy>> {
        let maps = self.maps.read();
        maps.proxies
            .iter()
            .filter(|(prefix, _)| request_path.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, proxy)| Arc::clone(proxy))
    }

    pub fn gateway_port(&self) -> String {
        self.state.gateway_port()
    }

    pub async fn set_gateway_port(&self, port: impl Into<String>) -> Result<(), StateError> {
        self.state.set_gateway_port(port).await
    }

    pub fn state(&self) -> &Arc<State> {
        &self.state
    }
}

fn parse_target(target: &str) -> Result<Url, RouteError> {
    let invalid = |reason: String| RouteError::InvalidTarget {
        target: target.to_string(),
        reason,
    };
    let url = Url::parse(target).map_err(|e| invalid(e.to_string()))?;
    if !url.has_host() {
        return Err(invalid("target has no host".to_string()));
    }
    Ok(url)
}

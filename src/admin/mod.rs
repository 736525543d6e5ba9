//! Control-plane API, versioned under `/v1/gateway`.
//!
//! | Method | Path                  | Auth                  |
//! |--------|-----------------------|-----------------------|
//! | GET    | `/ping`               | none                  |
//! | GET    | `/v1/gateway/routes`  | none                  |
//! | POST   | `/v1/gateway/routes`  | unless loopback       |
//! | GET    | `/v1/gateway/port`    | none                  |
//! | PUT    | `/v1/gateway/port`    | unless loopback       |

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::routing::RouteTable;
use self::auth::admin_auth_middleware;
use self::handlers::*;

pub const ROUTES_PATH: &str = "/v1/gateway/routes";
pub const PORT_PATH: &str = "/v1/gateway/port";

/// State shared by control-plane handlers.
#[derive(Debug, Clone)]
pub struct AdminState {
    pub table: Arc<RouteTable>,
    /// Bearer token for non-loopback callers.
    pub api_key: Option<String>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    let public = Router::new()
        .route("/ping", get(ping))
        .route(ROUTES_PATH, get(list_routes))
        .route(PORT_PATH, get(get_port));

    let guarded = Router::new()
        .route(ROUTES_PATH, post(create_route))
        .route(PORT_PATH, put(set_port))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware));

    public
        .merge(guarded)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

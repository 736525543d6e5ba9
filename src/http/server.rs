//! Data-plane HTTP surface.
//!
//! # Responsibilities
//! - Answer the liveness endpoint used by the hot-reload health check
//! - Dispatch every other request (including non-GET methods on the
//!   liveness path) to the longest-prefix route
//! - Wire up middleware (request ID, tracing)
//!
//! The router is cheap to clone and is attached to each listener the
//! reloader promotes, so every listener sees the same live route table.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::observability::metrics;
use crate::routing::RouteTable;

/// Liveness path answered by the data plane itself.
pub const PING_PATH: &str = "/ping";

/// State shared by data-plane handlers.
#[derive(Debug, Clone)]
pub struct DataPlaneState {
    pub table: Arc<RouteTable>,
}

/// Build the dispatch router attached to every data-plane listener.
pub fn data_plane_router(table: Arc<RouteTable>) -> Router {
    Router::new()
        .route(PING_PATH, get(ping).fallback(dispatch_handler))
        .fallback(dispatch_handler)
        .with_state(DataPlaneState { table })
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn ping() -> &'static str {
    "pong from gateway service"
}

/// Forward a request to the backend of its longest matching route.
pub async fn dispatch_handler(
    State(state): State<DataPlaneState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let path = request.uri().path().to_string();

    let response = match state.table.resolve_proxy(&path) {
        Some(proxy) => {
            tracing::debug!(path = %path, target_url = %proxy.target(), "Proxying request");
            proxy.forward(request, Some(peer)).await
        }
        None => {
            tracing::warn!(path = %path, "No route matched");
            StatusCode::NOT_FOUND.into_response()
        }
    };

    metrics::record_request(response.status().as_u16());
    response
}

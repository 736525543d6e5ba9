//! Static web UI listener.

use axum::Router;
use std::path::Path;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Serve the UI assets under `www_path`; directories resolve to `index.html`.
pub fn static_router(www_path: &Path) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(www_path))
        .layer(TraceLayer::new_for_http())
}

//! Shared utilities for integration testing.

use axum::{
    body::Bytes,
    extract::Request,
    http::{HeaderMap, Method, StatusCode},
    Json, Router,
};
use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;

use homegate::config::{ReloadConfig, State};
use homegate::RouteTable;

/// Start a backend that echoes what it received as JSON:
/// `{"method", "uri", "forwarded_for", "x_secret", "body"}`.
pub async fn start_echo_backend() -> SocketAddr {
    let app = Router::new().fallback(echo);
    serve(app).await
}

async fn echo(method: Method, headers: HeaderMap, request: Request) -> Json<Value> {
    let uri = request.uri().to_string();
    let body = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap_or_default();
    Json(json!({
        "method": method.as_str(),
        "uri": uri,
        "forwarded_for": headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok()),
        "x_secret": headers.get("x-secret").and_then(|v| v.to_str().ok()),
        "body": String::from_utf8_lossy(&body),
    }))
}

/// Start a backend whose status code is decided per request.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let app = Router::new().fallback(move |_body: Bytes| {
        let f = f.clone();
        async move {
            let (status, body) = f().await;
            (StatusCode::from_u16(status).unwrap_or(StatusCode::OK), body)
        }
    });
    serve(app).await
}

/// Serve `app` on an ephemeral loopback port with peer addresses attached.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await;
    });
    addr
}

/// A route table rooted in `dir` with no port assigned.
#[allow(dead_code)]
pub fn test_table(dir: &Path) -> Arc<RouteTable> {
    Arc::new(RouteTable::load(Arc::new(State::new(dir, "", dir))))
}

/// Reload settings tuned for tests: fast probes, short drain.
#[allow(dead_code)]
pub fn fast_reload_config() -> ReloadConfig {
    ReloadConfig {
        probe_path: "/ping".to_string(),
        probe_timeout_secs: 1,
        probe_attempts: 3,
        probe_pause_ms: 20,
        drain_grace_ms: 500,
    }
}

/// A port that was free a moment ago.
#[allow(dead_code)]
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("0.0.0.0:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// HTTP client that never reuses connections, so listeners can drain.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

//! Data-plane dispatch through a live listener.

use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;

use homegate::http::data_plane_router;
use homegate::{GatewayReloader, Route, RouteTable, Shutdown};

mod common;

async fn start_gateway(table: Arc<RouteTable>) -> (GatewayReloader, SocketAddr) {
    let reloader = GatewayReloader::new(
        data_plane_router(table),
        &common::fast_reload_config(),
        Shutdown::new(),
    );
    let addr = reloader.reload("0").await.unwrap();
    (reloader, addr)
}

#[tokio::test]
async fn test_longest_prefix_forwarding() {
    let dir = tempfile::tempdir().unwrap();
    let general = common::start_echo_backend().await;
    let specific = common::start_echo_backend().await;

    let table = common::test_table(dir.path());
    table
        .create_route(Route::new("/a", format!("http://{general}")))
        .unwrap();
    table
        .create_route(Route::new("/ab", format!("http://{specific}/base")))
        .unwrap();
    let (reloader, addr) = start_gateway(table).await;
    let client = common::client();

    let res = client
        .get(format!("http://127.0.0.1:{}/abc?x=1", addr.port()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["uri"], "/base/abc?x=1");

    let res = client
        .get(format!("http://127.0.0.1:{}/az", addr.port()))
        .send()
        .await
        .unwrap();
    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["uri"], "/az");

    reloader.close().await;
}

#[tokio::test]
async fn test_unmatched_path_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let backend = common::start_echo_backend().await;

    let table = common::test_table(dir.path());
    table
        .create_route(Route::new("/api", format!("http://{backend}")))
        .unwrap();
    let (reloader, addr) = start_gateway(table).await;

    let res = common::client()
        .get(format!("http://127.0.0.1:{}/other", addr.port()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    reloader.close().await;
}

#[tokio::test]
async fn test_method_body_and_forwarded_for_pass_through() {
    let dir = tempfile::tempdir().unwrap();
    let backend = common::start_echo_backend().await;

    let table = common::test_table(dir.path());
    table
        .create_route(Route::new("/api", format!("http://{backend}")))
        .unwrap();
    let (reloader, addr) = start_gateway(table).await;

    let res = common::client()
        .post(format!("http://127.0.0.1:{}/api/items", addr.port()))
        .header("x-forwarded-for", "203.0.113.7")
        .header("connection", "keep-alive, x-secret")
        .header("x-secret", "hop")
        .body("hello backend")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));

    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["uri"], "/api/items");
    assert_eq!(echoed["body"], "hello backend");
    assert_eq!(echoed["forwarded_for"], "203.0.113.7, 127.0.0.1");
    assert!(echoed["x_secret"].is_null());

    reloader.close().await;
}

#[tokio::test]
async fn test_unreachable_backend_is_bad_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let dead_port = common::free_port();

    let table = common::test_table(dir.path());
    table
        .create_route(Route::new("/api", format!("http://127.0.0.1:{dead_port}")))
        .unwrap();
    let (reloader, addr) = start_gateway(table).await;

    let res = common::client()
        .get(format!("http://127.0.0.1:{}/api", addr.port()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);

    reloader.close().await;
}

#[tokio::test]
async fn test_ping_is_answered_locally() {
    let dir = tempfile::tempdir().unwrap();
    let (reloader, addr) = start_gateway(common::test_table(dir.path())).await;

    let res = common::client()
        .get(format!("http://127.0.0.1:{}/ping", addr.port()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "pong from gateway service");

    reloader.close().await;
}

#[tokio::test]
async fn test_routes_added_after_start_are_live() {
    let dir = tempfile::tempdir().unwrap();
    let backend = common::start_echo_backend().await;
    let table = common::test_table(dir.path());
    let (reloader, addr) = start_gateway(table.clone()).await;
    let url = format!("http://127.0.0.1:{}/late/x", addr.port());

    let res = common::client().get(&url).send().await.unwrap();
    assert_eq!(res.status(), 404);

    table
        .create_route(Route::new("/late", format!("http://{backend}")))
        .unwrap();
    let res = common::client().get(&url).send().await.unwrap();
    assert_eq!(res.status(), 200);

    reloader.close().await;
}

#[tokio::test]
async fn test_non_get_on_liveness_path_is_forwarded() {
    let dir = tempfile::tempdir().unwrap();
    let backend = common::start_echo_backend().await;
    let table = common::test_table(dir.path());
    table
        .create_route(Route::new("/", format!("http://{backend}")))
        .unwrap();
    let (reloader, addr) = start_gateway(table).await;

    let res = common::client()
        .post(format!("http://127.0.0.1:{}/ping", addr.port()))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["uri"], "/ping");
    assert_eq!(echoed["body"], "payload");

    reloader.close().await;
}

#[tokio::test]
async fn test_non_get_on_liveness_path_without_route_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (reloader, addr) = start_gateway(common::test_table(dir.path())).await;

    let res = common::client()
        .delete(format!("http://127.0.0.1:{}/ping", addr.port()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    reloader.close().await;
}

//! Whole-process startup, port change and teardown.

use serde_json::{json, Value};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use homegate::config::loader::load_config;
use homegate::lifecycle::runtime_files::{
    read_address, MANAGEMENT_URL_FILENAME, PID_FILENAME, STATIC_URL_FILENAME,
};
use homegate::lifecycle::ReadinessNotifier;
use homegate::{Gateway, GatewayConfig, GatewayOptions, Route, Shutdown};

mod common;

#[derive(Clone, Default)]
struct CountingNotifier(Arc<AtomicUsize>);

impl ReadinessNotifier for CountingNotifier {
    fn notify_ready(&self) -> io::Result<bool> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

fn test_config(root: &Path, port: &str) -> GatewayConfig {
    let www = root.join("www");
    fs::create_dir_all(&www).unwrap();
    fs::write(www.join("index.html"), "hello ui").unwrap();

    let mut config = GatewayConfig::default();
    config.common.runtime_path = root.join("run");
    config.gateway.port = port.to_string();
    config.gateway.www_path = www;
    config.reload = common::fast_reload_config();
    config
}

#[tokio::test]
async fn test_start_registers_planes_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), "0");
    let runtime = config.common.runtime_path.clone();
    let notifier = CountingNotifier::default();
    let shutdown = Shutdown::new();

    let gateway = Gateway::start(GatewayOptions::new(config, None), shutdown.clone(), notifier.clone())
        .await
        .unwrap();

    let management = gateway.management_addr();
    let data = gateway.reloader().active_addr().unwrap();
    assert!(management.ip().is_loopback());
    assert!(gateway.static_addr().ip().is_loopback());

    // Marker files
    assert_eq!(
        fs::read_to_string(runtime.join(PID_FILENAME)).unwrap(),
        std::process::id().to_string()
    );
    assert_eq!(
        read_address(&runtime, MANAGEMENT_URL_FILENAME).unwrap(),
        format!("http://{management}")
    );
    assert_eq!(
        read_address(&runtime, STATIC_URL_FILENAME).unwrap(),
        format!("http://{}", gateway.static_addr())
    );

    // Self-registered routes
    let mut routes = gateway.table().routes();
    routes.sort_by(|a, b| a.path.cmp(&b.path));
    assert_eq!(
        routes,
        vec![
            Route::new("/", format!("http://{}", gateway.static_addr())),
            Route::new("/v1/gateway/port", format!("http://{management}")),
        ]
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(notifier.0.load(Ordering::SeqCst), 1);

    let client = common::client();
    let res = client
        .get(format!("http://127.0.0.1:{}/index.html", data.port()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "hello ui");

    let body: Value = client
        .get(format!("http://127.0.0.1:{}/v1/gateway/port", data.port()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"], "0");

    shutdown.trigger();
    gateway.run_until_shutdown().await;

    assert!(!runtime.join(PID_FILENAME).exists());
    assert!(!runtime.join(MANAGEMENT_URL_FILENAME).exists());
    assert!(!runtime.join(STATIC_URL_FILENAME).exists());
    assert!(runtime.join("routes.json").exists());
    assert!(client
        .get(format!("http://{management}/ping"))
        .send()
        .await
        .is_err());
}

#[tokio::test]
async fn test_port_change_through_data_plane_moves_listener() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("gateway.toml");
    let config = test_config(dir.path(), "0");
    let shutdown = Shutdown::new();

    let gateway = Gateway::start(
        GatewayOptions::new(config, Some(config_path.clone())),
        shutdown.clone(),
        CountingNotifier::default(),
    )
    .await
    .unwrap();
    let old = gateway.reloader().active_addr().unwrap();
    let new_port = common::free_port();

    // Loopback caller relayed by the gateway needs no credential.
    let res = common::client()
        .put(format!("http://127.0.0.1:{}/v1/gateway/port", old.port()))
        .json(&json!({ "port": new_port.to_string() }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    assert_eq!(gateway.reloader().active_addr().unwrap().port(), new_port);
    assert_eq!(gateway.state().gateway_port(), new_port.to_string());
    assert_eq!(load_config(&config_path).unwrap().gateway.port, new_port.to_string());

    let res = common::client()
        .get(format!("http://127.0.0.1:{new_port}/ping"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    shutdown.trigger();
    gateway.run_until_shutdown().await;
}

#[tokio::test]
async fn test_empty_port_is_discovered_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("gateway.toml");
    let config = test_config(dir.path(), "");
    let shutdown = Shutdown::new();

    let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    let free = common::free_port();
    let mut options = GatewayOptions::new(config, Some(config_path.clone()));
    options.candidate_ports = vec![taken.local_addr().unwrap().port(), free];

    let gateway = Gateway::start(options, shutdown.clone(), CountingNotifier::default())
        .await
        .unwrap();

    assert_eq!(gateway.state().gateway_port(), free.to_string());
    assert_eq!(gateway.reloader().active_addr().unwrap().port(), free);
    assert_eq!(load_config(&config_path).unwrap().gateway.port, free.to_string());

    shutdown.trigger();
    gateway.run_until_shutdown().await;
}

#[tokio::test]
async fn test_unwritable_runtime_dir_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    fs::write(&blocker, "not a directory").unwrap();

    let mut config = test_config(dir.path(), "0");
    config.common.runtime_path = blocker.join("run");

    let result = Gateway::start(
        GatewayOptions::new(config, None),
        Shutdown::new(),
        CountingNotifier::default(),
    )
    .await;
    assert!(matches!(result, Err(homegate::lifecycle::StartupError::Runtime(_))));
}

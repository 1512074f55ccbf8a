//! Debug server tests over real HTTP.

use std::time::Duration;

use stagehand::config::DebugServerConfig;
use stagehand::debug::{DebugParams, DebugServer};
use stagehand::lifecycle::{Application, Lifetime, PhaseCell};

mod common;
use common::*;

fn enabled_config() -> DebugServerConfig {
    DebugServerConfig {
        enabled: true,
        address: "127.0.0.1:0".into(),
        token: "test-instance".into(),
        drain_timeout_ms: 500,
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn test_routes_serve_status_and_vars() {
    let params = DebugParams::new();
    params.publish("answer", || 42);

    let bound = DebugServer::new("probe", enabled_config(), PhaseCell::new())
        .with_params(params.clone())
        .bind()
        .await
        .unwrap();
    let addr = bound.local_addr();
    let lifetime = Lifetime::new();
    let server = tokio::spawn(bound.serve(lifetime.clone()));

    let client = client();

    let index = client.get(format!("http://{}/", addr)).send().await.unwrap();
    assert_eq!(index.status(), 200);
    let body = index.text().await.unwrap();
    assert!(body.contains("test-instance"));
    assert!(body.contains("probe"));

    let vars: serde_json::Value = client
        .get(format!("http://{}/debug/vars", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(vars["answer"], 42);

    let status: serde_json::Value = client
        .get(format!("http://{}/debug/status", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["phase"], "not_started");
    assert_eq!(status["app"], "probe");

    let metrics = client.get(format!("http://{}/metrics", addr)).send().await.unwrap();
    assert_eq!(metrics.status(), 404);

    lifetime.cancel();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_runs_as_daemon_until_stop() {
    let log = EventLog::new();
    let app = Application::new("probe", test_config());
    let bound = DebugServer::new("probe", enabled_config(), app.phase())
        .bind()
        .await
        .unwrap();
    let addr = bound.local_addr();

    let app = app
        .add_init_stage("one", [init_with_cleanup(&log, "c1")])
        .add_daemons([bound.into_daemon()]);
    let stop = app.stop_handle();
    let run = tokio::spawn(app.start());

    tokio::time::sleep(Duration::from_millis(100)).await;
    let status: serde_json::Value = client()
        .get(format!("http://{}/debug/status", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["phase"], "running");

    stop.request_stop("test");
    run.await.unwrap().unwrap();
    assert_eq!(log.count("clean:c1"), 1);
}

#[tokio::test]
async fn test_disabled_server_exits_immediately() {
    let log = EventLog::new();
    let server = DebugServer::new("probe", DebugServerConfig::default(), PhaseCell::new());

    let app = Application::new("probe", test_config())
        .add_init_stage("one", [init_with_cleanup(&log, "c1")])
        .add_daemons([server.into_daemon()]);

    tokio::time::timeout(Duration::from_secs(1), app.start())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.count("clean:c1"), 1);
}

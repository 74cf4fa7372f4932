//! HTTP control surface tests driven through the router

#![cfg(unix)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use arcade_config::ServerConfig;
use arcade_server::{create_app, AppState};
use arcade_supervisor::{StaticProber, Supervisor, SupervisorConfig, WorkerDefinition, WorkerRegistry};

const LOOP: &str = "while true; do sleep 0.1; done";

fn write_script(dir: &Path, file: &str, body: &str) {
    std::fs::write(dir.join(file), format!("#!/bin/sh\n{}\n", body)).unwrap();
}

fn setup() -> (TempDir, Arc<Supervisor>, Router) {
    let dir = TempDir::new().unwrap();
    write_script(dir.path(), "color.sh", &format!("echo ready\n{}", LOOP));
    write_script(dir.path(), "shape.sh", LOOP);
    write_script(dir.path(), "crash.sh", "echo 'no camera' >&2\nexit 3");

    let definitions = vec![
        WorkerDefinition::new("color", "color.sh").with_interpreter("sh"),
        WorkerDefinition::new("shape", "shape.sh").with_interpreter("sh"),
        WorkerDefinition::new("crash", "crash.sh").with_interpreter("sh"),
        WorkerDefinition::new("missing", "missing.sh").with_interpreter("sh"),
    ];
    let registry = WorkerRegistry::new(definitions, dir.path()).unwrap();
    let config = SupervisorConfig {
        log_dir: dir.path().join("logs"),
        health_check_grace: Duration::from_millis(300),
        stop_timeout: Duration::from_secs(1),
        settle_interval: Duration::from_millis(50),
        restart_settle: Duration::from_millis(50),
        ..SupervisorConfig::default()
    };
    let supervisor = Arc::new(Supervisor::new(registry, config).with_prober(Arc::new(StaticProber::none())));
    let app = create_app(AppState::new(supervisor.clone()), &ServerConfig::default());

    (dir, supervisor, app)
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_root_banner() {
    let (_dir, _supervisor, app) = setup();
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"Arcade backend is running");
}

#[tokio::test]
async fn test_health_lists_workers() {
    let (_dir, _supervisor, app) = setup();
    let (status, body) = send(&app, Method::GET, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["running_processes"], Value::Array(vec![]));
    assert_eq!(body["workers"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_start_status_stop_round() {
    let (_dir, _supervisor, app) = setup();

    let (status, body) = send(&app, Method::POST, "/workers/color/start").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "color");
    assert_eq!(body["status"], "running");
    assert_eq!(body["already_running"], false);
    let pid = body["pid"].as_u64().unwrap();

    let (_, body) = send(&app, Method::POST, "/workers/color/start").await;
    assert_eq!(body["already_running"], true);
    assert_eq!(body["pid"].as_u64().unwrap(), pid);

    let (_, body) = send(&app, Method::GET, "/workers").await;
    assert_eq!(body["workers"]["color"], true);
    assert_eq!(body["workers"]["shape"], false);

    let (_, body) = send(&app, Method::GET, "/health").await;
    assert_eq!(body["running_processes"][0], "color");

    let (status, body) = send(&app, Method::GET, "/workers/color/logs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alive"], true);
    assert_eq!(body["stdout_tail"][0], "ready");

    let (status, body) = send(&app, Method::POST, "/workers/color/stop").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "stopped");

    let (_, body) = send(&app, Method::GET, "/workers").await;
    assert_eq!(body["workers"]["color"], false);

    let (_, body) = send(&app, Method::POST, "/workers/color/stop").await;
    assert_eq!(body["status"], "not_running");
}

#[tokio::test]
async fn test_immediate_exit_error() {
    let (_dir, _supervisor, app) = setup();
    let (status, body) = send(&app, Method::POST, "/workers/crash/start").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "PROCESS_EXITED_IMMEDIATELY");
    assert_eq!(body["error"]["details"]["exit_code"], 3);
    assert_eq!(body["error"]["details"]["stderr_tail"][0], "no camera");

    let (_, body) = send(&app, Method::GET, "/workers").await;
    assert_eq!(body["workers"]["crash"], false);
}

#[tokio::test]
async fn test_not_found_errors() {
    let (_dir, _supervisor, app) = setup();

    let (status, body) = send(&app, Method::POST, "/workers/tetris/start").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "UNKNOWN_WORKER");

    let (status, body) = send(&app, Method::POST, "/workers/tetris/stop").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "UNKNOWN_WORKER");

    let (status, body) = send(&app, Method::GET, "/workers/tetris/logs").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "UNKNOWN_WORKER");

    let (status, body) = send(&app, Method::POST, "/workers/missing/start").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "SCRIPT_NOT_FOUND");

    let (status, body) = send(&app, Method::GET, "/no/such/route").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_stop_all() {
    let (_dir, supervisor, app) = setup();
    send(&app, Method::POST, "/workers/color/start").await;
    send(&app, Method::POST, "/workers/shape/start").await;
    assert_eq!(supervisor.running_workers().len(), 2);

    let (status, body) = send(&app, Method::POST, "/workers/stop-all").await;
    assert_eq!(status, StatusCode::OK);
    let mut stopped: Vec<String> = body["stopped"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    stopped.sort();
    assert_eq!(stopped, vec!["color".to_string(), "shape".to_string()]);
    assert_eq!(body["failed"], Value::Array(vec![]));
    assert!(supervisor.running_workers().is_empty());
}

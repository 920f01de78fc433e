//! Integration tests for the unauthenticated probes

use std::net::TcpListener;
use tabungan::auth::HashParams;
use tabungan::configuration::JwtSettings;
use tabungan::startup::{run, AppServices};
use tabungan::uploads::UploadStore;

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let services = AppServices::in_memory(
        &JwtSettings::new("health-check-secret-of-decent-length"),
        HashParams::default(),
        UploadStore::new(std::env::temp_dir(), 1024),
    );
    let server = run(listener, services).expect("Failed to create server");

    let _ = tokio::spawn(async move {
        let _ = server.await;
    });

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());
}

#[tokio::test]
async fn ping_returns_pong() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/api/v1/ping", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "pong");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .header("X-Request-ID", "probe-42")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.headers()["x-request-id"], "probe-42");
}

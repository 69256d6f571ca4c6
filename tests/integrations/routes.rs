#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::app::{spawn_app, test_config};
use helpers::fake_provider::{FakeProvider, NonFiniteProvider};
use reqwest::{header::CONTENT_TYPE, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn route_listing_is_fixed() {
    let app = spawn_app(test_config(), Arc::new(FakeProvider::new())).await.unwrap();

    let body = reqwest::get(app.url("/")).await.unwrap().text().await.unwrap();
    assert_eq!(body, r#"["/","/ping","/meminfo","/loadinfo","/uptime","/cpuinfo"]"#);

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn ping_returns_pong() {
    let app = spawn_app(test_config(), Arc::new(FakeProvider::new())).await.unwrap();

    let response = reqwest::get(app.url("/ping")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"response": "pong"}));

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn every_metric_route_serves_json() {
    let app = spawn_app(test_config(), Arc::new(FakeProvider::new())).await.unwrap();

    let expected = [
        ("/meminfo", json!({"total": 16000, "used": 4001, "free": 11999, "shared": 100})),
        (
            "/loadinfo",
            json!({"avg_one_minute": 1.0, "avg_five_minutes": 2.0, "avg_fifteen_minutes": 3.0}),
        ),
        ("/uptime", json!({"active": 101.0, "idle": 50.0})),
        ("/cpuinfo", json!({"hz": 100, "cpus": 4, "page_bytes": 4096})),
    ];

    for (path, body) in expected {
        let response = reqwest::get(app.url(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "status for {}", path);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.json::<Value>().await.unwrap(), body, "body for {}", path);
    }

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn loadinfo_is_served_from_cache_within_ttl() {
    let provider = Arc::new(FakeProvider::new());
    let app = spawn_app(test_config(), provider.clone()).await.unwrap();

    let first = reqwest::get(app.url("/loadinfo")).await.unwrap().bytes().await.unwrap();
    let second = reqwest::get(app.url("/loadinfo")).await.unwrap().bytes().await.unwrap();

    assert_eq!(
        first.as_ref(),
        br#"{"avg_one_minute":1.0,"avg_five_minutes":2.0,"avg_fifteen_minutes":3.0}"#
    );
    assert_eq!(first, second);
    assert_eq!(FakeProvider::calls(&provider.load_calls), 1);

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn expired_snapshot_is_refreshed() {
    let provider = Arc::new(FakeProvider::new());
    let mut config = test_config();
    config.ttl.meminfo_ms = Some(100);
    let app = spawn_app(config, provider.clone()).await.unwrap();

    let first: Value = reqwest::get(app.url("/meminfo")).await.unwrap().json().await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    let second: Value = reqwest::get(app.url("/meminfo")).await.unwrap().json().await.unwrap();

    assert_eq!(first["used"], 4001);
    assert_eq!(second["used"], 4002);
    assert_eq!(FakeProvider::calls(&provider.mem_calls), 2);

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn cpuinfo_is_fetched_once() {
    let provider = Arc::new(FakeProvider::new());
    let app = spawn_app(test_config(), provider.clone()).await.unwrap();

    for _ in 0..5 {
        let response = reqwest::get(app.url("/cpuinfo")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(FakeProvider::calls(&provider.cpu_calls), 1);

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn metrics_have_independent_entries() {
    let provider = Arc::new(FakeProvider::new());
    let app = spawn_app(test_config(), provider.clone()).await.unwrap();

    reqwest::get(app.url("/uptime")).await.unwrap();
    assert!(app.cache.get("uptime").is_some());
    assert!(app.cache.get("meminfo").is_none());
    assert_eq!(FakeProvider::calls(&provider.mem_calls), 0);

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn non_finite_readings_are_500_and_not_cached() {
    let app = spawn_app(test_config(), Arc::new(NonFiniteProvider)).await.unwrap();

    for path in ["/loadinfo", "/uptime"] {
        let response = reqwest::get(app.url(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "status for {}", path);
        assert_ne!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.text().await.unwrap(), "Could not marshal data");
    }
    assert!(app.cache.get("loadinfo").is_none());
    assert!(app.cache.get("uptime").is_none());

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn non_get_methods_are_rejected() {
    let app = spawn_app(test_config(), Arc::new(FakeProvider::new())).await.unwrap();

    let response = reqwest::Client::new()
        .post(app.url("/meminfo"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let app = spawn_app(test_config(), Arc::new(FakeProvider::new())).await.unwrap();

    let response = reqwest::get(app.url("/diskinfo")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn bind_failure_is_an_error() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = test_config();
    config.server.port = occupied.local_addr().unwrap().port();

    let result = spawn_app(config, Arc::new(FakeProvider::new())).await;
    let err = result.err().expect("binding an occupied port must fail");
    assert!(err.to_string().contains("Failed to bind HTTP listener"));
}

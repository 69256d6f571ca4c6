#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::app::{spawn_app, test_config};
use helpers::fake_provider::FakeProvider;
use reqwest::StatusCode;
use serial_test::serial;
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::test]
#[serial]
async fn cache_hits_and_misses_are_exported() {
    let mut config = test_config();
    config.metrics.enabled = true;
    config.metrics.listen_address = "127.0.0.1:0".parse::<SocketAddr>().unwrap();

    let provider = Arc::new(FakeProvider::new());
    let app = spawn_app(config, provider.clone()).await.unwrap();
    let metrics_addr = app.metrics_addr.expect("metrics listener should be bound");

    for _ in 0..3 {
        let response = reqwest::get(app.url("/loadinfo")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(FakeProvider::calls(&provider.load_calls), 1);

    let response = reqwest::get(format!("http://{}/metrics", metrics_addr))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();

    assert!(
        body.contains(r#"snapshot_cache_hits_total{metric="loadinfo"} 2"#),
        "metrics body:\n{}",
        body
    );
    assert!(
        body.contains(r#"snapshot_cache_misses_total{metric="loadinfo"} 1"#),
        "metrics body:\n{}",
        body
    );
    assert!(body.contains("metric_fetch_duration_seconds"));
    assert!(!body.contains("snapshot_serialization_failures_total{"));

    app.shutdown().await.unwrap();
}

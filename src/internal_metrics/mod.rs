//! # Internal Metrics Module
//!
//! Optional self-observability for the snapshot cache. When enabled, a
//! Prometheus recorder is installed as the global `metrics` recorder and a
//! separate `/metrics` listener is started. The public route set is not
//! affected.
//!
//! ## Components:
//!
//! - **`MetricsBuilder`**: installs the recorder, registers descriptions
//!   and binds the exporter listener.
//!
//! - **`MetricsServer`**: (Defined in `server.rs`) An `axum`-based web server
//!   that exposes the `/metrics` endpoint for Prometheus to scrape.

use crate::config::MetricsConfig;
use crate::internal_metrics::server::MetricsServer;
use metrics::Unit;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::error;

pub mod server;

/// Registers descriptions for every series the cache layer records.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "snapshot_cache_hits_total",
        Unit::Count,
        "Requests answered from a fresh cached snapshot, labeled by metric."
    );
    metrics::describe_counter!(
        "snapshot_cache_misses_total",
        Unit::Count,
        "Requests that refreshed a missing or expired snapshot, labeled by metric."
    );
    metrics::describe_counter!(
        "snapshot_serialization_failures_total",
        Unit::Count,
        "Fresh metric values that could not be encoded as JSON, labeled by metric."
    );
    metrics::describe_histogram!(
        "metric_fetch_duration_seconds",
        Unit::Seconds,
        "Time spent in the metric source on a cache miss, labeled by metric."
    );
}

/// Builder for the metrics system.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    /// Creates a new `MetricsBuilder` with the given configuration.
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Installs the Prometheus recorder and prepares its server.
    ///
    /// Returns `None` when metrics are disabled or any step fails. Failures
    /// are logged and never abort startup.
    pub async fn build(
        self,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Option<(MetricsServer, SocketAddr)> {
        if !self.config.enabled {
            return None;
        }

        let recorder = match PrometheusBuilder::new().set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0],
        ) {
            Ok(builder) => builder.build_recorder(),
            Err(e) => {
                error!("Failed to configure Prometheus recorder: {}", e);
                return None;
            }
        };
        let handle = recorder.handle();

        let listener = match TcpListener::bind(self.config.listen_address).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(
                    "Failed to bind metrics server to {}: {}",
                    self.config.listen_address, e
                );
                return None;
            }
        };

        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                error!("Failed to get local address for metrics server: {}", e);
                return None;
            }
        };

        if let Err(e) = metrics::set_global_recorder(recorder) {
            error!("Failed to install Prometheus recorder: {}", e);
            return None;
        }
        describe_metrics();

        Some((MetricsServer::new(listener, handle, shutdown_rx), addr))
    }
}

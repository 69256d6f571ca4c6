//! The main application logic, decoupled from the entry point.

use crate::{
    config::Config,
    core::SystemInfoProvider,
    internal_metrics::MetricsBuilder,
    server::{build_router, HttpServer},
    snapshot_cache::SnapshotCache,
    sysinfo_provider::SysinfoProvider,
    task_manager::TaskManager,
};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, instrument};

/// A handle to the running application.
pub struct App {
    task_manager: TaskManager,
    local_addr: SocketAddr,
    metrics_addr: Option<SocketAddr>,
    cache: SnapshotCache,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The address the public HTTP server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_addr
    }

    /// The snapshot cache shared by all metric routes.
    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Waits for the shutdown signal and then waits for all tasks to stop.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.task_manager.shutdown_rx();
        shutdown_rx.changed().await.ok();
        info!("Shutdown signal received. Waiting for tasks to complete...");

        self.task_manager.shutdown().await;
        Ok(())
    }
}

/// Builder for the main application.
///
/// Separates constructing the components from running them, and lets tests
/// swap in their own metric source or cache.
pub struct AppBuilder {
    config: Config,
    provider_override: Option<Arc<dyn SystemInfoProvider>>,
    cache_override: Option<SnapshotCache>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            provider_override: None,
            cache_override: None,
        }
    }

    /// Overrides the metric source for testing.
    pub fn provider_override(mut self, provider: Arc<dyn SystemInfoProvider>) -> Self {
        self.provider_override = Some(provider);
        self
    }

    /// Overrides the snapshot cache for testing.
    pub fn cache_override(mut self, cache: SnapshotCache) -> Self {
        self.cache_override = Some(cache);
        self
    }

    /// Binds the listeners and spawns the servers, returning a runnable `App`.
    ///
    /// Fails if the public listener cannot be bound.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;
        let task_manager = TaskManager::new(shutdown_rx.clone());

        let metrics_addr = match MetricsBuilder::new(config.metrics.clone())
            .build(shutdown_rx.clone())
            .await
        {
            Some((server, addr)) => {
                info!("Metrics server listening on {}", addr);
                task_manager.spawn("MetricsServer", server.run());
                Some(addr)
            }
            None => None,
        };

        let provider = self
            .provider_override
            .unwrap_or_else(|| Arc::new(SysinfoProvider::new()));
        let cache = self.cache_override.unwrap_or_default();
        let router = build_router(provider, cache.clone(), &config.ttl);

        let bind_addr = config.server.socket_addr();
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("Failed to bind HTTP listener to {}", bind_addr))?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {}", local_addr);

        task_manager.spawn("HttpServer", HttpServer::new(listener, router, shutdown_rx).run());

        Ok(App {
            task_manager,
            local_addr,
            metrics_addr,
            cache,
        })
    }
}

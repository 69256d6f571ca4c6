//! Test helpers for running the full application instance.

use anyhow::Result;
use rfetch::{app::App, config::Config, SnapshotCache, SystemInfoProvider};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::{sync::watch, task::JoinHandle, time::timeout};

/// A running application bound to an ephemeral localhost port.
pub struct TestApp {
    pub addr: SocketAddr,
    pub cache: SnapshotCache,
    pub metrics_addr: Option<SocketAddr>,
    shutdown_tx: watch::Sender<bool>,
    app_handle: JoinHandle<Result<()>>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Shuts down the application and waits for it to terminate.
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown_tx.send(true)?;
        match timeout(Duration::from_secs(5), self.app_handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(anyhow::anyhow!("App failed to shut down within the timeout")),
        }
    }
}

/// Returns a config bound to 127.0.0.1 on an ephemeral port.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.listen_address = Ipv4Addr::LOCALHOST.into();
    config.server.port = 0;
    config
}

/// Starts the application with the given config and metric source.
pub async fn spawn_app(config: Config, provider: Arc<dyn SystemInfoProvider>) -> Result<TestApp> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = App::builder(config)
        .provider_override(provider)
        .build(shutdown_rx)
        .await?;
    let addr = app.local_addr();
    let cache = app.cache().clone();
    let metrics_addr = app.metrics_addr();
    let app_handle = tokio::spawn(app.run());

    Ok(TestApp {
        addr,
        cache,
        metrics_addr,
        shutdown_tx,
        app_handle,
    })
}

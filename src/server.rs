//! # HTTP Frontend
//!
//! This module assembles the public router (route listing, liveness and one
//! cached binding per metric) and defines `HttpServer`, which serves it on an
//! already-bound listener until the shutdown signal fires.

use crate::config::TtlConfig;
use crate::core::{MetricKey, SystemInfoProvider};
use crate::routes::{cached_json_route, list_routes, ping};
use crate::snapshot_cache::SnapshotCache;
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, trace};

/// Builds the public router.
///
/// Every metric binding shares `cache` and calls into `provider` on a miss.
pub fn build_router(
    provider: Arc<dyn SystemInfoProvider>,
    cache: SnapshotCache,
    ttl: &TtlConfig,
) -> Router {
    let mut router = Router::new()
        .route("/", get(list_routes))
        .route("/ping", get(ping));

    for key in MetricKey::ALL {
        let provider = provider.clone();
        let cache = cache.clone();
        let ttl = ttl.for_metric(key);
        let name = key.as_str();
        let method_router = match key {
            MetricKey::MemInfo => {
                cached_json_route(name, move || provider.mem_info(), cache, ttl)
            }
            MetricKey::LoadInfo => {
                cached_json_route(name, move || provider.load_info(), cache, ttl)
            }
            MetricKey::Uptime => cached_json_route(name, move || provider.uptime(), cache, ttl),
            MetricKey::CpuInfo => {
                cached_json_route(name, move || provider.cpu_info(), cache, ttl)
            }
        };
        router = router.route(key.path(), method_router);
    }

    router.layer(middleware::from_fn(log_request))
}

/// Logs method, path, status and latency for every request.
async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed = ?start.elapsed(),
        "Handled request"
    );
    response
}

/// The public HTTP server.
pub struct HttpServer {
    listener: TcpListener,
    router: Router,
    shutdown_rx: watch::Receiver<bool>,
}

impl HttpServer {
    /// Creates a new `HttpServer` but does not spawn it.
    pub fn new(listener: TcpListener, router: Router, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            listener,
            router,
            shutdown_rx,
        }
    }

    /// Returns a future that serves requests until a shutdown signal is received.
    pub fn run(self) -> impl Future<Output = ()> {
        let mut shutdown_rx = self.shutdown_rx;
        let listener = self.listener;
        let router = self.router;

        async move {
            let shutdown = async move {
                let _ = shutdown_rx.changed().await;
                trace!("HTTP server received shutdown signal.");
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("HTTP server error: {}", e);
            }
            trace!("HTTP server task finished.");
        }
    }
}

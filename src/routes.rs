//! # Route Handlers
//!
//! This module defines the handlers behind every public path:
//!
//! - **`CachedRoute`**: binds a metric key, a producer and a TTL to the
//!   shared `SnapshotCache`. Each request is answered from the cache while
//!   the snapshot is fresh, and by calling the producer and re-caching the
//!   encoded result otherwise.
//!
//! - **`list_routes`** and **`ping`**: the two static endpoints.

use crate::snapshot_cache::{SnapshotCache, Ttl};
use axum::{
    body::Bytes,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
};
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, trace};

/// Every path served by the frontend, in listing order.
pub const ROUTES: [&str; 6] = [
    "/",
    "/ping",
    "/meminfo",
    "/loadinfo",
    "/uptime",
    "/cpuinfo",
];

const PING_BODY: &str = "{\"response\": \"pong\"}";

/// Errors raised while answering a metric request.
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("Could not marshal data")]
    Serialize(#[from] serde_json::Error),
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// A fully encoded JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSnapshot(pub Bytes);

impl IntoResponse for JsonSnapshot {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "application/json")], self.0).into_response()
    }
}

/// Serve-fresh-or-refresh binding for a single metric.
///
/// Misses are serialized per binding: the first request to observe a miss
/// refreshes the snapshot while later ones wait and then re-read the cache.
/// Hits never wait, and bindings for different keys never block each other.
pub struct CachedRoute<T, F> {
    key: &'static str,
    producer: Arc<F>,
    cache: SnapshotCache,
    ttl: Ttl,
    refresh_lock: Arc<Mutex<()>>,
    _value: PhantomData<fn() -> T>,
}

impl<T, F> Clone for CachedRoute<T, F> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            producer: self.producer.clone(),
            cache: self.cache.clone(),
            ttl: self.ttl,
            refresh_lock: self.refresh_lock.clone(),
            _value: PhantomData,
        }
    }
}

impl<T, F> CachedRoute<T, F>
where
    T: Serialize,
    F: Fn() -> T + Send + Sync + 'static,
{
    pub fn new(key: &'static str, producer: F, cache: SnapshotCache, ttl: Ttl) -> Self {
        Self {
            key,
            producer: Arc::new(producer),
            cache,
            ttl,
            refresh_lock: Arc::new(Mutex::new(())),
            _value: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Returns the current snapshot, refreshing it first if it is missing or stale.
    ///
    /// On a serialization failure nothing is written to the cache, so any
    /// previously stored entry is left exactly as it was.
    pub async fn respond(&self) -> Result<JsonSnapshot, RouteError> {
        if let Some(payload) = self.cache.get(self.key) {
            trace!(metric = self.key, "Snapshot cache hit");
            metrics::counter!("snapshot_cache_hits_total", "metric" => self.key).increment(1);
            return Ok(JsonSnapshot(payload));
        }

        let _guard = self.refresh_lock.lock().await;

        // Another request may have refreshed the snapshot while we waited.
        if let Some(payload) = self.cache.get(self.key) {
            trace!(metric = self.key, "Snapshot refreshed by concurrent request");
            metrics::counter!("snapshot_cache_hits_total", "metric" => self.key).increment(1);
            return Ok(JsonSnapshot(payload));
        }

        metrics::counter!("snapshot_cache_misses_total", "metric" => self.key).increment(1);
        let payload = self.refresh().map_err(|e| {
            error!(metric = self.key, "Failed to serialize metric: {}", e);
            metrics::counter!("snapshot_serialization_failures_total", "metric" => self.key)
                .increment(1);
            e
        })?;

        self.cache.set(self.key, payload.clone(), self.ttl);
        Ok(JsonSnapshot(payload))
    }

    fn refresh(&self) -> Result<Bytes, RouteError> {
        let start = Instant::now();
        let value = (self.producer)();
        let duration = start.elapsed();
        metrics::histogram!("metric_fetch_duration_seconds", "metric" => self.key)
            .record(duration.as_secs_f64());
        debug!(metric = self.key, ?duration, "Fetched fresh metric");

        Ok(Bytes::from(serde_json::to_vec(&value)?))
    }
}

/// Builds a `GET` handler serving `producer`'s output through `cache`.
pub fn cached_json_route<T, F>(
    key: &'static str,
    producer: F,
    cache: SnapshotCache,
    ttl: Ttl,
) -> MethodRouter
where
    T: Serialize + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    let route = CachedRoute::new(key, producer, cache, ttl);
    get(move || {
        let route = route.clone();
        async move { route.respond().await.into_response() }
    })
}

/// Lists every supported path.
pub async fn list_routes() -> Result<JsonSnapshot, RouteError> {
    Ok(JsonSnapshot(Bytes::from(serde_json::to_vec(&ROUTES)?)))
}

/// Liveness check.
pub async fn ping() -> JsonSnapshot {
    JsonSnapshot(Bytes::from_static(PING_BODY.as_bytes()))
}

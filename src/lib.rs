//! rfetch - host metrics over HTTP
//!
//! Serves memory, load average, uptime and CPU details as JSON. Each metric
//! is cached as a pre-encoded snapshot with its own time-to-live and is only
//! recomputed once that snapshot has expired.

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod internal_metrics;
pub mod routes;
pub mod server;
pub mod snapshot_cache;
pub mod sysinfo_provider;
pub mod task_manager;

// Re-export core types for convenience
pub use crate::core::*;
pub use snapshot_cache::{SnapshotCache, Ttl};

//! Process-wide store of pre-serialized metric snapshots.
//!
//! Each key holds at most one `CacheEntry`. Entries carry their own expiry
//! and are checked lazily on read: an expired entry stays in the map until
//! the next `set` for the same key replaces it. Nothing here ever calls a
//! metric producer.

use axum::body::Bytes;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// How long a snapshot stays fresh after it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Fresh for the given duration.
    For(Duration),
    /// Computed once, fresh for the rest of the process lifetime.
    Never,
}

impl Ttl {
    /// Computes the expiry instant for an entry stored at `now`.
    ///
    /// Returns `None` for entries that never expire. A duration too large to
    /// represent as an `Instant` is treated the same way instead of wrapping.
    fn expires_at(self, now: Instant) -> Option<Instant> {
        match self {
            Ttl::For(ttl) => now.checked_add(ttl),
            Ttl::Never => None,
        }
    }
}

impl From<Option<Duration>> for Ttl {
    fn from(ttl: Option<Duration>) -> Self {
        ttl.map(Ttl::For).unwrap_or(Ttl::Never)
    }
}

/// A single cached snapshot. Immutable once built; refreshes swap in a new one.
#[derive(Debug)]
pub(crate) struct CacheEntry {
    key: String,
    pub(crate) payload: Bytes,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}

/// A concurrent key to snapshot map with per-entry expiry.
///
/// Cloning is cheap and yields a handle to the same underlying store.
#[derive(Clone)]
pub struct SnapshotCache {
    entries: Cache<String, Arc<CacheEntry>>,
}

impl std::fmt::Debug for SnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotCache {
    /// Creates an empty cache.
    ///
    /// The backing map has neither a capacity bound nor a map-level TTL, so
    /// it never evicts on its own. Freshness is decided per entry in `get`.
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().build(),
        }
    }

    /// Returns the payload for `key` if an entry exists and is still fresh.
    ///
    /// A stale entry is reported as a miss but left in place.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let entry = self.entries.get(key)?;
        if entry.is_fresh(Instant::now()) {
            Some(entry.payload.clone())
        } else {
            trace!(key = %entry.key, "Snapshot expired");
            None
        }
    }

    /// Installs or replaces the entry for `key`.
    ///
    /// The new entry is built completely before it is published, so
    /// concurrent readers see either the old payload or the new one.
    pub fn set(&self, key: &str, payload: Bytes, ttl: Ttl) {
        let entry = CacheEntry {
            key: key.to_string(),
            payload,
            expires_at: ttl.expires_at(Instant::now()),
        };
        trace!(key, ?ttl, "Storing snapshot");
        self.entries.insert(key.to_string(), Arc::new(entry));
    }

    /// Returns the stored entry for `key` regardless of freshness.
    #[cfg(test)]
    pub(crate) fn entry(&self, key: &str) -> Option<Arc<CacheEntry>> {
        self.entries.get(key)
    }
}

//! Core domain types and the metric source contract for rfetch
//!
//! This module defines the fixed-shape metric records served over HTTP and
//! the `SystemInfoProvider` trait through which they are obtained. The
//! cache and route layers only ever see these types; how the numbers are
//! produced is the provider's business.

use serde::{ser::Error as _, Deserialize, Serialize, Serializer};
use std::fmt;

/// Stable identifier for a cached metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKey {
    MemInfo,
    LoadInfo,
    Uptime,
    CpuInfo,
}

impl MetricKey {
    /// All cached metrics, in route-listing order.
    pub const ALL: [MetricKey; 4] = [
        MetricKey::MemInfo,
        MetricKey::LoadInfo,
        MetricKey::Uptime,
        MetricKey::CpuInfo,
    ];

    /// The cache key and metric label for this metric.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::MemInfo => "meminfo",
            MetricKey::LoadInfo => "loadinfo",
            MetricKey::Uptime => "uptime",
            MetricKey::CpuInfo => "cpuinfo",
        }
    }

    /// The HTTP path this metric is served on.
    pub fn path(&self) -> &'static str {
        match self {
            MetricKey::MemInfo => "/meminfo",
            MetricKey::LoadInfo => "/loadinfo",
            MetricKey::Uptime => "/uptime",
            MetricKey::CpuInfo => "/cpuinfo",
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Memory totals, in bytes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MemInfo {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub shared: u64,
}

/// System load averages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct LoadInfo {
    #[serde(serialize_with = "finite")]
    pub avg_one_minute: f64,
    #[serde(serialize_with = "finite")]
    pub avg_five_minutes: f64,
    #[serde(serialize_with = "finite")]
    pub avg_fifteen_minutes: f64,
}

/// Time since boot and accumulated idle time, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Uptime {
    #[serde(serialize_with = "finite")]
    pub active: f64,
    #[serde(serialize_with = "finite")]
    pub idle: f64,
}

/// Serializes a float, failing on NaN and infinities.
///
/// JSON has no encoding for them and `serde_json` would silently emit `null`.
fn finite<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if !value.is_finite() {
        return Err(S::Error::custom(format!("non-finite float: {}", value)));
    }
    serializer.serialize_f64(*value)
}

/// Static CPU topology details.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CpuInfo {
    /// Kernel clock ticks per second.
    pub hz: i64,
    pub cpus: usize,
    pub page_bytes: usize,
}

/// A source of host metrics.
///
/// Implementations are called synchronously on the request path, once per
/// cache miss. They must always return a value; any internal failure has to
/// be folded into the returned record.
pub trait SystemInfoProvider: Send + Sync {
    fn mem_info(&self) -> MemInfo;
    fn load_info(&self) -> LoadInfo;
    fn uptime(&self) -> Uptime;
    fn cpu_info(&self) -> CpuInfo;
}

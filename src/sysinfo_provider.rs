//! # Host Metrics Provider
//!
//! This module defines `SysinfoProvider`, the default `SystemInfoProvider`.
//! Memory, load and uptime come from the `sysinfo` crate. A few values it
//! does not expose (shared memory, idle time, clock ticks, page size) are
//! read from `/proc` or `sysconf` where available and fall back to fixed
//! values elsewhere.

use crate::core::{CpuInfo, LoadInfo, MemInfo, SystemInfoProvider, Uptime};
use std::sync::Mutex;
use sysinfo::System;
use tracing::warn;

const DEFAULT_CLOCK_TICKS: i64 = 100;
const DEFAULT_PAGE_BYTES: usize = 4096;

/// Reads host metrics through `sysinfo`.
pub struct SysinfoProvider {
    system: Mutex<System>,
}

impl std::fmt::Debug for SysinfoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoProvider").finish_non_exhaustive()
    }
}

impl Default for SysinfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoProvider {
    /// Creates a new provider. No data is loaded until the first call.
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl SystemInfoProvider for SysinfoProvider {
    fn mem_info(&self) -> MemInfo {
        let mut system = match self.system.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("System info mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        system.refresh_memory();

        MemInfo {
            total: system.total_memory(),
            used: system.used_memory(),
            free: system.free_memory(),
            shared: proc::shared_memory_bytes().unwrap_or(0),
        }
    }

    fn load_info(&self) -> LoadInfo {
        let load = System::load_average();
        LoadInfo {
            avg_one_minute: load.one,
            avg_five_minutes: load.five,
            avg_fifteen_minutes: load.fifteen,
        }
    }

    fn uptime(&self) -> Uptime {
        proc::uptime().unwrap_or_else(|| Uptime {
            active: System::uptime() as f64,
            idle: 0.0,
        })
    }

    fn cpu_info(&self) -> CpuInfo {
        CpuInfo {
            hz: sysconf::clock_ticks().unwrap_or(DEFAULT_CLOCK_TICKS),
            cpus: num_cpus::get(),
            page_bytes: sysconf::page_bytes().unwrap_or(DEFAULT_PAGE_BYTES),
        }
    }
}

#[cfg(target_os = "linux")]
mod proc {
    use crate::core::Uptime;

    pub fn shared_memory_bytes() -> Option<u64> {
        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        parse_shmem(&meminfo)
    }

    pub fn uptime() -> Option<Uptime> {
        let uptime = std::fs::read_to_string("/proc/uptime").ok()?;
        parse_uptime(&uptime)
    }

    /// Extracts the `Shmem:` line (reported in kB) as bytes.
    pub(super) fn parse_shmem(meminfo: &str) -> Option<u64> {
        meminfo
            .lines()
            .find_map(|line| line.strip_prefix("Shmem:"))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|kb| kb.parse::<u64>().ok())
            .map(|kb| kb * 1024)
    }

    pub(super) fn parse_uptime(contents: &str) -> Option<Uptime> {
        let mut fields = contents.split_whitespace();
        let active = fields.next()?.parse().ok()?;
        let idle = fields.next()?.parse().ok()?;
        Some(Uptime { active, idle })
    }
}

#[cfg(not(target_os = "linux"))]
mod proc {
    use crate::core::Uptime;

    pub fn shared_memory_bytes() -> Option<u64> {
        None
    }

    pub fn uptime() -> Option<Uptime> {
        None
    }
}

#[cfg(unix)]
mod sysconf {
    pub fn clock_ticks() -> Option<i64> {
        // SAFETY: `sysconf` only reads a system constant.
        let hz = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        (hz > 0).then_some(hz as i64)
    }

    pub fn page_bytes() -> Option<usize> {
        // SAFETY: `sysconf` only reads a system constant.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        (size > 0).then_some(size as usize)
    }
}

#[cfg(not(unix))]
mod sysconf {
    pub fn clock_ticks() -> Option<i64> {
        None
    }

    pub fn page_bytes() -> Option<usize> {
        None
    }
}

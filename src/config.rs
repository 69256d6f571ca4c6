//! Configuration management for rfetch
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer built-in defaults, an optional TOML file,
//! `RFETCH_`-prefixed environment variables and command-line arguments.

use crate::cli::Cli;
use crate::core::MetricKey;
use crate::snapshot_cache::Ttl;
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Configuration for the HTTP listener.
    pub server: ServerConfig,
    /// Per-metric cache lifetimes.
    pub ttl: TtlConfig,
    /// Configuration for the Prometheus exporter.
    pub metrics: MetricsConfig,
}

/// Configuration for the HTTP listener.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// The IP address to bind to.
    pub listen_address: IpAddr,
    /// The port to bind to.
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_address, self.port)
    }
}

/// Cache lifetimes in milliseconds. An absent value means the metric is
/// fetched once and never refreshed.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TtlConfig {
    pub meminfo_ms: Option<u64>,
    pub loadinfo_ms: Option<u64>,
    pub uptime_ms: Option<u64>,
    pub cpuinfo_ms: Option<u64>,
}

impl TtlConfig {
    /// Returns the cache lifetime for `key`.
    pub fn for_metric(&self, key: MetricKey) -> Ttl {
        let ms = match key {
            MetricKey::MemInfo => self.meminfo_ms,
            MetricKey::LoadInfo => self.loadinfo_ms,
            MetricKey::Uptime => self.uptime_ms,
            MetricKey::CpuInfo => self.cpuinfo_ms,
        };
        Ttl::from(ms.map(Duration::from_millis))
    }
}

/// Configuration for the Prometheus exporter.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether to serve internal metrics at all.
    pub enabled: bool,
    /// The address for the `/metrics` listener.
    pub listen_address: SocketAddr,
}

impl Config {
    /// Loads the configuration by layering defaults, the config file given
    /// on the command line, environment variables and CLI flags.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = &cli.config {
            if !path.exists() {
                bail!("Config file not found at specified path: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        let config = figment
            // e.g. RFETCH_SERVER__PORT=9000
            .merge(Env::prefixed("RFETCH_").split("__"))
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig {
                listen_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                port: 8080,
            },
            ttl: TtlConfig {
                meminfo_ms: Some(1_000),
                loadinfo_ms: Some(60_000),
                uptime_ms: Some(1_000),
                cpuinfo_ms: None,
            },
            metrics: MetricsConfig {
                enabled: false,
                listen_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9091),
            },
        }
    }
}

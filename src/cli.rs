//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using
//! the `clap` crate. They are parsed at startup and merged over the
//! configuration file and environment variables, taking precedence over both.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Serves host memory, load, uptime and CPU details as JSON over HTTP.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Port to bind to [default: 8080].
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Logging level (e.g. "debug", "info,rfetch=trace").
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut server = Dict::new();
        if let Some(port) = self.port {
            server.insert("port".into(), Value::from(port));
        }

        let mut dict = Dict::new();
        if !server.is_empty() {
            dict.insert("server".into(), Value::from(server));
        }
        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}

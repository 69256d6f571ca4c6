//! rfetch - host metrics over HTTP
//!
//! Entry point: parses arguments, loads configuration, initializes logging
//! and runs the HTTP frontend until Ctrl-C.

use anyhow::Result;
use clap::Parser;
use rfetch::{app::App, cli::Cli, config::Config, core::MetricKey};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt().init();
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("rfetch starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Listen Address: {}", config.server.socket_addr());
    for key in MetricKey::ALL {
        info!("{} TTL: {:?}", key, config.ttl.for_metric(key));
    }
    info!(
        "Internal Metrics: {}",
        if config.metrics.enabled {
            config.metrics.listen_address.to_string()
        } else {
            "Disabled".to_string()
        }
    );
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // A bind failure ends the process here with a nonzero exit status.
    let app = App::builder(config).build(shutdown_rx).await?;
    let app_handle = tokio::spawn(app.run());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Shutting down gracefully...");
    if shutdown_tx.send(true).is_err() {
        error!("No tasks were listening for the shutdown signal.");
    }

    match app_handle.await {
        Ok(result) => result?,
        Err(e) => error!("Application task panicked: {:?}", e),
    }

    info!("All tasks shut down. Exiting.");
    Ok(())
}

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use emberd::LogLevel;
use emberd::Registry;
use emberd::api;
use emberd::config::Config;
use emberd::config::LoggingConfig;
use emberd::discovery::SystemArpTable;
use emberd::format_diagnostics;
use emberd::startup;
use tokio::sync::oneshot;
use tracing_subscriber::prelude::*;

/// Local home automation controller
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, default_value = "config/config.yaml")]
    config: PathBuf,

    /// Override the configured log level
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    /// Override the configured API port
    #[arg(short, long)]
    port: Option<u16>,
}

impl Cli {
    /// Command line values take precedence over the config file
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(port) = self.port {
            config.api.port = port;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration; any error here is fatal
    let (mut config, diagnostics) = Config::from_file(&cli.config)?;
    cli.apply_overrides(&mut config);

    init_tracing(&config.logging);

    tracing::info!("Starting Local Home Automation System");
    tracing::info!("Loaded config from: {}", cli.config.display());
    if !diagnostics.is_empty() {
        tracing::warn!("{}", format_diagnostics(&diagnostics).trim_end());
    }

    // Devices are registered before the API starts accepting requests
    let registry = Registry::new();
    let arp = SystemArpTable::from(&config.discovery);
    startup::register_thermostats(&config.thermostats, &registry, &arp).await;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let mut server = tokio::spawn(api::serve(
        config.api.listen.clone(),
        config.api.port,
        registry,
        shutdown_rx,
    ));

    tokio::select! {
        signal = shutdown_signal() => match signal {
            Ok(name) => tracing::info!("Received {}", name),
            Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
        },
        result = &mut server => {
            result
                .context("API server task panicked")?
                .context("API server failed")?;
            anyhow::bail!("API server exited unexpectedly");
        }
    }

    tracing::info!("Shutting down");
    shutdown_tx.send(()).ok();
    server
        .await
        .context("API server task panicked")?
        .context("API server failed")?;

    tracing::info!("emberd shutdown complete");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(logging.filter())
        .init();
}

/// Wait for SIGINT or SIGTERM, returning the name of the signal received
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::SignalKind;
    use tokio::signal::unix::signal;

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "Ctrl+C")
}

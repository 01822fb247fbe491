//! plugind Binary Entry Point
//!
//! Loads the job configuration, starts every job and streams protocol text
//! to standard output until the parent closes the pipe or a signal arrives.
//! Logs go to standard error.

use clap::Parser;
use plugind::{
    JobContext, JobRegistry, OutputBuilder, PluginConfig,
    collector::portcheck::PortcheckCollector,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Plugin name announced in chart declarations.
const PLUGIN_NAME: &str = "plugind";

/// plugind - external data collection plugin
#[derive(Parser, Debug)]
#[command(name = "plugind", version, about, long_about = None)]
struct Cli {
    /// Minimum collection interval in seconds for every job
    update_every: Option<u64>,

    /// Path to configuration file
    #[arg(short, long, default_value = "plugind.yaml", env = "PLUGIND_CONFIG")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing; stdout belongs to the protocol
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,plugind=debug".into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = PluginConfig::load_with_collector_path(&cli.config)?;
    if let Some(floor) = cli.update_every {
        config.collectors.apply_update_every_floor(floor);
    }

    let output = OutputBuilder::stdout()
        .channel_capacity(config.channel_capacity)
        .build()?;
    let ctx = JobContext::new(output.writer.clone(), PLUGIN_NAME)
        .with_internal_monitoring(config.internal_monitoring_enabled());
    let registry = JobRegistry::new(ctx);

    let mut started = 0;
    for portcheck in config.collectors.portcheck {
        let name = portcheck.job.name.clone();
        let job = portcheck.job.clone();
        match registry.spawn(PortcheckCollector::new(portcheck), job).await {
            Ok(_) => started += 1,
            Err(e) => tracing::error!(job = %name, error = %e, "Failed to start job"),
        }
    }

    if started == 0 {
        tracing::warn!("No job could be started, disabling plugin");
        if !output.writer.is_closed() {
            output.writer.write_block("DISABLE\n".to_string()).await?;
        }
        registry.shutdown().await?;
        output.shutdown().await?;
        return Ok(());
    }

    tracing::info!(jobs = started, "Plugin running");
    tokio::select! {
        _ = shutdown_signal() => {}
        _ = registry.wait_idle() => {
            tracing::warn!("All jobs have stopped");
        }
    }

    tracing::info!("Shutting down jobs...");
    if let Err(e) = registry.shutdown().await {
        tracing::error!("Failed to shutdown jobs: {}", e);
    }

    tracing::info!("Shutting down output...");
    output.shutdown().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}

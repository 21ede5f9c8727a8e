//! sc-metrics - Tenable.sc metric reporting tool
//!
//! `sc-metrics emit` collects a snapshot immediately and then once per
//! configured interval, sending every gauge to DogStatsD.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use sc_metrics_agent::client::ApiProvider;
use sc_metrics_agent::config::{AgentConfig, DEFAULT_CONFIG_PATH};
use sc_metrics_agent::emitter::Emitter;
use sc_metrics_agent::logging;
use sc_metrics_agent::scheduler::Scheduler;

#[derive(Debug, Parser)]
#[command(name = "sc-metrics", version, about = "Tenable SC metric reporting tool")]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, global = true, env = "SC_METRICS_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Force debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Emit Datadog metrics
    Emit {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,

        /// Log metrics instead of sending them
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AgentConfig::load(&cli.config)
        .await
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;

    logging::init(&config.logging, cli.verbose).context("Failed to initialize logging")?;

    info!(version = env!("CARGO_PKG_VERSION"), "sc-metrics starting...");

    match cli.command {
        Command::Emit { once, dry_run } => emit(config, once, dry_run).await,
    }
}

async fn emit(config: AgentConfig, once: bool, dry_run: bool) -> Result<()> {
    let emitter = if dry_run {
        Emitter::dry_run(config.datadog.tags.clone())
    } else {
        Emitter::statsd(&config.datadog.address, config.datadog.tags.clone())
            .await
            .context("Failed to create statsd emitter")?
    };

    let provider = ApiProvider::new(config.tenablesc);
    let mut scheduler = Scheduler::new(provider, emitter, config.interval);

    scheduler.run(once).await.context("Emit loop failed")
}

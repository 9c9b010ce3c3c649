//! attest daemon: entry point for replaying verification scripts.

mod script;

use anyhow::Context;
use attest_node::NodeConfig;
use attest_utils::{init_logging, LogFormat};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "attest-daemon", about = "attest content verification daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "ATTEST_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "ATTEST_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "ATTEST_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Collect Prometheus metrics and include them in the replay summary.
    #[arg(long, env = "ATTEST_ENABLE_METRICS")]
    metrics: bool,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run a JSON operation script against an in-memory engine.
    Replay {
        /// Script file.
        script: PathBuf,

        /// Write a snapshot of the final engine state here
        /// (defaults to `snapshot_path` from the config).
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if cli.metrics {
        config.enable_metrics = true;
    }

    init_logging(config.log_format, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::info!(path = %path.display(), "loaded config");
    }

    match cli.command {
        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Replay { script, snapshot } => {
            let parsed = script::Script::from_file(&script)?;
            let mut stdout = std::io::stdout().lock();
            let service = script::replay(&parsed, &config, &mut stdout).await?;

            if let Some(path) = snapshot.or_else(|| config.snapshot_path.clone()) {
                service
                    .save_snapshot(&path)
                    .await
                    .with_context(|| format!("writing snapshot {}", path.display()))?;
            }
        }
    }

    Ok(())
}

//! ghstat - letter statistics for GitHub repositories

mod commands;
mod exit_code;
mod output;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use ghstat_core::{CancellationToken, Config, ConfigManager};

use commands::{Commands, Context};
use exit_code::ExitCode;
use output::{Formatter, OutputConfig};

#[derive(Parser, Debug)]
#[command(name = "ghstat", version, about, long_about = None)]
struct Cli {
    /// Output strict JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Only print errors and results
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding config.toml
    #[arg(long, global = true, env = "GHSTAT_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn setup_logging(verbose: u8) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(dir: Option<&PathBuf>) -> anyhow::Result<Config> {
    let manager = match dir {
        Some(dir) => ConfigManager::with_dir(dir),
        None => ConfigManager::new().context("Failed to locate config directory")?,
    };
    manager
        .load()
        .with_context(|| format!("Failed to load {}", manager.config_path().display()))
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let output = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        quiet: cli.quiet,
    };

    let config = match load_config(cli.config_dir.as_ref()) {
        Ok(c) => c,
        Err(e) => {
            Formatter::new(output).error(&format!("{e:#}"));
            return ExitCode::UsageError.into();
        }
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling outstanding requests");
            on_interrupt.cancel();
        }
    });

    let ctx = Context {
        config,
        cancel,
        output,
    };
    commands::execute(cli.command, ctx).await.into()
}

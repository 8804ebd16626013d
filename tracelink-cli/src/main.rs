//! Tracelink CLI -- normalize and resolve supply-chain QR payloads.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use tracelink_core::config::TracelinkConfig;
use tracelink_core::error::{ConfigError, TracelinkError};

use cli::{Cli, Commands};
use error::CliError;
use output::OutputWriter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config).await;

    // a broken config file still gets default logging so the error can be reported
    let mut general = config
        .as_ref()
        .map(|c| c.general.clone())
        .unwrap_or_default();
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    logging::init_tracing(&general)?;
    tracelink_core::metrics::describe_all();

    if let Err(e) = run(cli, config).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }

    Ok(())
}

async fn run(cli: Cli, config: Result<TracelinkConfig, TracelinkError>) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Normalize(args) => commands::normalize::execute(args, &writer),
        Commands::Resolve(args) => commands::resolve::execute(args, &config?, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    }
}

/// Loads the config file; a missing file falls back to defaults plus env overrides.
async fn load_config(path: &Path) -> Result<TracelinkConfig, TracelinkError> {
    match TracelinkConfig::load(path).await {
        Err(TracelinkError::Config(ConfigError::FileNotFound { path })) => {
            debug!(path = %path, "config file not found, using defaults");
            let mut config = TracelinkConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
        other => other,
    }
}

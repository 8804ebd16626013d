//! Logging initialization for the tracelink CLI.
//!
//! The CLI prints its results on stdout, often as JSON for scripts, so every
//! log line goes to stderr. Verbosity comes from the `[general]` section of
//! `TracelinkConfig` after `main` has applied `--log-level`; `RUST_LOG`, when
//! set, replaces both.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tracelink_core::config::GeneralConfig;

/// Initialize the global tracing subscriber for this process.
///
/// Called once from `main`, after config loading and before any command runs.
/// A second call fails because the global subscriber is already set.
///
/// # Formats
///
/// * `"json"` - one JSON object per line, for piping stderr into a collector
/// * `"pretty"` - human-readable multi-line output for interactive use
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&config.log_level)?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match config.log_format.as_str() {
        "json" => registry
            .with(stderr_layer.json())
            .try_init()
            .context("failed to initialize JSON tracing subscriber")?,
        "pretty" => registry
            .with(stderr_layer.pretty())
            .try_init()
            .context("failed to initialize pretty tracing subscriber")?,
        other => anyhow::bail!("unknown log format '{other}', expected 'json' or 'pretty'"),
    }

    Ok(())
}

/// Builds the filter for `--log-level` / `general.log_level`.
///
/// A malformed directive such as `--log-level app=loud` is
/// reported instead of being dropped.
fn level_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).with_context(|| format!("invalid log level '{level}'"))
}

//! CLI argument parsing using clap derive API
//!
//! Purely declarative; no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Tracelink -- resolve supply-chain QR payloads into traceable entities.
///
/// Use `tracelink <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "tracelink", version, about, long_about = None)]
pub struct Cli {
    /// Path to the tracelink.toml configuration file.
    #[arg(short, long, default_value = "tracelink.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Normalize a raw QR payload without contacting the backend.
    Normalize(NormalizeArgs),

    /// Resolve a payload against the backend, as if typed in by hand.
    Resolve(ResolveArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- normalize ----

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Raw payload text (plain id, deep link or JSON object).
    pub payload: String,
}

// ---- resolve ----

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Raw payload text (plain id, deep link or JSON object).
    pub payload: String,

    /// Which consumer projection to print.
    #[arg(long, default_value = "trace")]
    pub consumer: ConsumerKind,

    /// Bearer token for this lookup; overrides resolver.auth_token.
    #[arg(long)]
    pub token: Option<String>,
}

/// Bundled consumers the result can be dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConsumerKind {
    /// Inventory entity id field.
    Identifier,
    /// Shipment recipient form.
    Recipient,
    /// Lab test manufacturer form.
    Manufacturer,
    /// Traceability detail panel.
    Trace,
}

// ---- config ----

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, scanner, resolver).
        #[arg(long)]
        section: Option<String>,
    },
}

//! CLI-specific error types and exit code mapping

use tracelink_core::error::TracelinkError;
use tracelink_qr_scanner::QrScannerError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The payload was read but did not resolve to a backend entity.
    #[error("unresolved: {0}")]
    Unresolved(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from tracelink-core.
    #[error("{0}")]
    Core(#[from] TracelinkError),

    /// Scanner domain error.
    #[error("scanner error: {0}")]
    Scanner(#[from] QrScannerError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                              |
    /// |------|--------------------------------------|
    /// | 0    | Success                              |
    /// | 1    | General / command error              |
    /// | 2    | Configuration error                  |
    /// | 5    | Payload degraded or unresolved       |
    /// | 10   | IO error                             |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(TracelinkError::Config(_)) => 2,
            Self::Unresolved(_) => 5,
            Self::Io(_) | Self::Core(TracelinkError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) | Self::Scanner(_) => 1,
        }
    }
}

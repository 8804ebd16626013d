//! `tracelink normalize` command handler
//!
//! Runs the payload normalizer offline; no backend call is made.

use std::io::Write;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use tracelink_qr_scanner::{PayloadNormalizer, display_identifier};

use crate::cli::NormalizeArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `normalize` command.
///
/// # Errors
///
/// Returns `CliError::Scanner` when the payload carries no usable identifier.
pub fn execute(args: NormalizeArgs, writer: &OutputWriter) -> Result<(), CliError> {
    let report = build_report(&args.payload)?;
    debug!(canonical_id = %report.canonical_id, "payload normalized");
    writer.render(&report)
}

fn build_report(raw: &str) -> Result<NormalizeReport, CliError> {
    let normalized = PayloadNormalizer::normalize(raw)?;
    Ok(NormalizeReport {
        display_id: display_identifier(raw, &normalized),
        canonical_id: normalized.canonical_id,
        structured: normalized.structured,
    })
}

/// Result of normalizing one payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeReport {
    /// Identifier sent to the backend lookup
    pub canonical_id: String,
    /// Identifier shown to identifier-only consumers
    pub display_id: String,
    /// Parsed JSON object, when the payload was one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured: Option<Map<String, Value>>,
}

impl Render for NormalizeReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Canonical id: {}", self.canonical_id.bold())?;
        writeln!(w, "Display id:   {}", self.display_id)?;

        match &self.structured {
            Some(fields) => {
                writeln!(w, "Structured payload:")?;
                for (key, value) in fields {
                    writeln!(w, "  {}: {}", key, value)?;
                }
            }
            None => writeln!(w, "Structured payload: {}", "none".dimmed())?,
        }

        Ok(())
    }
}

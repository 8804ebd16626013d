//! `tracelink resolve` command handler
//!
//! Submits the payload as manual entry against the configured backend and
//! dispatches the report to one bundled consumer.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use tracelink_core::config::TracelinkConfig;
use tracelink_core::pipeline::RequestContext;
use tracelink_core::types::SessionId;
use tracelink_core::SessionResult;
use tracelink_qr_scanner::{
    EntityIdField, HttpScanLookup, ManufacturerForm, NoCamera, NoDecoder, QrScannerBuilder,
    QrScannerConfig, RecipientForm, ResultDispatcher, ScanFailure, ScanOutcome, ScanReport,
    TraceabilityPanel, TraceabilityView,
};

use crate::cli::{ConsumerKind, ResolveArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `resolve` command.
///
/// # Errors
///
/// * `CliError::Config` if the resolver section cannot build an HTTP client
/// * `CliError::Unresolved` if the session ends degraded or failed
pub async fn execute(
    args: ResolveArgs,
    config: &TracelinkConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let lookup = HttpScanLookup::from_core(&config.resolver)
        .map_err(|e| CliError::Config(e.to_string()))?;
    let ctx = request_context(args.token, &config.resolver.auth_token);

    let (scanner, events) = QrScannerBuilder::new()
        .config(QrScannerConfig::from_core(&config.scanner))
        .camera(NoCamera)
        .decoder(NoDecoder)
        .lookup(lookup)
        .request_context(ctx)
        .build()?;

    info!(base_url = %config.resolver.base_url, "resolving payload");
    let report = scanner.submit_manual_text(&args.payload).await?;

    if let Some(mut events) = events {
        while let Ok(event) = events.try_recv() {
            debug!(event = %event, "scan event");
        }
    }

    let resolve_report = ResolveReport::new(args.consumer, &report);
    writer.render(&resolve_report)?;

    match report.outcome {
        ScanOutcome::Resolved(_) => Ok(()),
        ScanOutcome::Degraded(degraded) => Err(CliError::Unresolved(degraded.message)),
        ScanOutcome::Failed(failure) => Err(CliError::Unresolved(failure.message)),
        ScanOutcome::Cancelled => Err(CliError::Command("scan cancelled".to_owned())),
    }
}

/// `--token` wins over `resolver.auth_token`; an empty token means anonymous.
fn request_context(flag: Option<String>, configured: &str) -> RequestContext {
    match flag.filter(|t| !t.is_empty()) {
        Some(token) => RequestContext::with_token(token),
        None if !configured.is_empty() => RequestContext::with_token(configured),
        None => RequestContext::anonymous(),
    }
}

/// What the selected consumer ended up holding.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Projection {
    Identifier { value: String },
    Fields { fields: Vec<(String, String)> },
    Detail { view: TraceabilityView },
    Unavailable { failure: ScanFailure },
    Nothing,
}

impl Projection {
    fn from_parts<T>(value: Option<T>, notice: Option<ScanFailure>, wrap: impl FnOnce(T) -> Self) -> Self {
        match (value, notice) {
            (_, Some(failure)) => Self::Unavailable { failure },
            (Some(value), None) => wrap(value),
            (None, None) => Self::Nothing,
        }
    }
}

/// Dispatches the report to a fresh adapter of the given kind and reads it back.
fn project_for(kind: ConsumerKind, report: &ScanReport) -> Projection {
    let mut dispatcher = ResultDispatcher::new();
    dispatcher.expect(report.session_id);

    match kind {
        ConsumerKind::Identifier => {
            let field = Arc::new(EntityIdField::new());
            dispatcher.register(field.clone());
            dispatcher.dispatch(report);
            Projection::from_parts(field.value(), field.notice(), |value| {
                Projection::Identifier { value }
            })
        }
        ConsumerKind::Recipient => {
            let form = Arc::new(RecipientForm::new());
            dispatcher.register(form.clone());
            dispatcher.dispatch(report);
            Projection::from_parts(form.fields(), form.notice(), |f| Projection::Fields {
                fields: f.fields,
            })
        }
        ConsumerKind::Manufacturer => {
            let form = Arc::new(ManufacturerForm::new());
            dispatcher.register(form.clone());
            dispatcher.dispatch(report);
            Projection::from_parts(form.fields(), form.notice(), |f| Projection::Fields {
                fields: f.fields,
            })
        }
        ConsumerKind::Trace => {
            let panel = Arc::new(TraceabilityPanel::new());
            dispatcher.register(panel.clone());
            dispatcher.dispatch(report);
            Projection::from_parts(panel.view(), panel.notice(), |view| Projection::Detail {
                view,
            })
        }
    }
}

fn consumer_name(kind: ConsumerKind) -> &'static str {
    match kind {
        ConsumerKind::Identifier => "identifier",
        ConsumerKind::Recipient => "recipient",
        ConsumerKind::Manufacturer => "manufacturer",
        ConsumerKind::Trace => "trace",
    }
}

/// Output of one `resolve` run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveReport {
    pub session_id: SessionId,
    pub result: SessionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_id: Option<String>,
    pub consumer: &'static str,
    pub projection: Projection,
    /// Full session report
    pub report: ScanReport,
}

impl ResolveReport {
    fn new(kind: ConsumerKind, report: &ScanReport) -> Self {
        Self {
            session_id: report.session_id,
            result: report.outcome.result(),
            canonical_id: report.normalized.as_ref().map(|n| n.canonical_id.clone()),
            display_id: report.display_id.clone(),
            consumer: consumer_name(kind),
            projection: project_for(kind, report),
            report: report.clone(),
        }
    }
}

impl Render for ResolveReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let label = self.result.as_str().to_uppercase();
        let label = match self.result {
            SessionResult::Resolved => label.green().bold(),
            SessionResult::Degraded => label.yellow().bold(),
            SessionResult::Failed | SessionResult::Cancelled => label.red().bold(),
        };

        writeln!(w, "Session {} ({})", self.session_id, self.report.source)?;
        writeln!(w, "  Result:       {}", label)?;
        if let Some(id) = &self.canonical_id {
            writeln!(w, "  Canonical id: {}", id)?;
        }
        if let Some(id) = &self.display_id {
            writeln!(w, "  Display id:   {}", id)?;
        }

        writeln!(w)?;
        writeln!(w, "{} consumer:", self.consumer.bold())?;
        match &self.projection {
            Projection::Identifier { value } => writeln!(w, "  Entity id: {}", value)?,
            Projection::Fields { fields } if fields.is_empty() => {
                writeln!(w, "  {}", "no fields could be filled".dimmed())?
            }
            Projection::Fields { fields } => {
                for (name, value) in fields {
                    writeln!(w, "  {}: {}", name, value)?;
                }
            }
            Projection::Detail { view } => {
                writeln!(w, "  {} {}", view.title.bold(), view.entity_id)?;
                for (label, value) in &view.fields {
                    writeln!(w, "  {}: {}", label, value)?;
                }
                if !view.source_farmers.is_empty() {
                    writeln!(w, "  Source farmers: {}", view.source_farmers.join(", "))?;
                }
                if !view.composition.is_empty() {
                    writeln!(w, "  Composition: {}", view.composition.join(", "))?;
                }
            }
            Projection::Unavailable { failure } => {
                writeln!(w, "  {}", failure.message.red())?;
                if let Some(detail) = &failure.detail {
                    writeln!(w, "  Detail: {}", detail)?;
                }
            }
            Projection::Nothing => writeln!(w, "  {}", "nothing delivered".dimmed())?,
        }

        Ok(())
    }
}

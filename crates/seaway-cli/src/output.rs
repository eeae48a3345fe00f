//! Output formatting for command results.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

use seaway_lib::{DiagnosticsReport, ExportSummary, RouteRenderMode, RouteSummary};

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Markdown tables.
    Markdown,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    pub fn render_route(self, summary: &RouteSummary) -> Result<String> {
        match self {
            OutputFormat::Text => Ok(summary.render(RouteRenderMode::PlainText)),
            OutputFormat::Markdown => Ok(summary.render(RouteRenderMode::Markdown)),
            OutputFormat::Json => to_json(summary),
        }
    }

    pub fn render_diagnostics(
        self,
        report: &DiagnosticsReport,
        export: Option<&ExportSummary>,
    ) -> Result<String> {
        if self == OutputFormat::Json {
            #[derive(Serialize)]
            struct DiagnoseOutput<'a> {
                #[serde(flatten)]
                report: &'a DiagnosticsReport,
                #[serde(skip_serializing_if = "Option::is_none")]
                export: Option<&'a ExportSummary>,
            }
            return to_json(&DiagnoseOutput { report, export });
        }

        let mut buffer = String::new();
        let _ = writeln!(
            buffer,
            "Nodes: {} ({} edges)",
            report.node_count, report.edge_count
        );
        let _ = writeln!(buffer, "Isolated nodes: {}", report.isolated_count);
        let _ = writeln!(
            buffer,
            "Connected components: {} (connected: {})",
            report.component_count, report.is_connected
        );
        let occupied: Vec<_> = report
            .buckets
            .iter()
            .filter(|bucket| bucket.isolated > 0)
            .collect();
        if !occupied.is_empty() {
            let _ = writeln!(buffer, "Isolated nodes by region:");
        }
        for bucket in occupied {
            let _ = writeln!(
                buffer,
                "  lat {:.2}..{:.2}, lon {:.2}..{:.2}: {}",
                bucket.lat_min, bucket.lat_max, bucket.lon_min, bucket.lon_max, bucket.isolated
            );
        }
        if let Some(export) = export {
            let _ = writeln!(
                buffer,
                "Exported {} isolated nodes (resumed from {}, total {})",
                export.written, export.resumed_from, export.total
            );
        }
        Ok(buffer)
    }
}

/// Serialize any command output as pretty JSON with a trailing newline.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut rendered =
        serde_json::to_string_pretty(value).context("failed to serialize output as JSON")?;
    rendered.push('\n');
    Ok(rendered)
}

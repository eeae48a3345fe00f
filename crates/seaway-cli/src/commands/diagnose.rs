//! Connectivity diagnostics command handler.

use std::path::PathBuf;

use anyhow::{Context, Result};

use seaway_lib::{diagnose, export_isolated, Graph};

use crate::output::OutputFormat;

/// Arguments for the diagnose command.
#[derive(Debug, Clone)]
pub struct DiagnoseArgs {
    pub rows: usize,
    pub cols: usize,
    /// Append isolated node coordinates to this file.
    pub export: Option<PathBuf>,
    /// Resume offset file; defaults to `<export>.checkpoint`.
    pub checkpoint: Option<PathBuf>,
    pub batch_size: usize,
}

impl DiagnoseArgs {
    fn checkpoint_path(&self, export: &std::path::Path) -> PathBuf {
        self.checkpoint.clone().unwrap_or_else(|| {
            let mut name = export.as_os_str().to_owned();
            name.push(".checkpoint");
            PathBuf::from(name)
        })
    }
}

pub fn handle_diagnose(graph: &Graph, args: &DiagnoseArgs, format: OutputFormat) -> Result<()> {
    let report = diagnose(graph, args.rows, args.cols);

    let export = match &args.export {
        Some(output) => {
            let checkpoint = args.checkpoint_path(output);
            let summary = export_isolated(graph, output, &checkpoint, args.batch_size)
                .with_context(|| {
                    format!("failed to export isolated nodes to {}", output.display())
                })?;
            Some(summary)
        }
        None => None,
    };

    print!("{}", format.render_diagnostics(&report, export.as_ref())?);
    Ok(())
}

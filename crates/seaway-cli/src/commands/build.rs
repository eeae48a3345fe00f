//! Graph build command handler.

use std::fs;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::commands::GraphSource;
use crate::output::{to_json, OutputFormat};

/// Arguments for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildArgs {
    /// Discard any existing cache before building.
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildOutput {
    pub dataset: String,
    pub cache: String,
    pub nodes: usize,
    pub edges: usize,
    pub walkable: usize,
    pub hazard_zones: usize,
}

/// Build (or load) the navigation graph and report its size.
pub fn handle_build(source: &GraphSource, args: &BuildArgs, format: OutputFormat) -> Result<()> {
    if args.force && source.cache.exists() {
        fs::remove_file(&source.cache).with_context(|| {
            format!("failed to remove existing cache {}", source.cache.display())
        })?;
    }

    let graph = source.load_graph()?;
    let output = BuildOutput {
        dataset: source.dataset.display().to_string(),
        cache: source.cache.display().to_string(),
        nodes: graph.len(),
        edges: graph.edge_count(),
        walkable: graph.walkable_count(),
        hazard_zones: graph.hazards().len(),
    };

    match format {
        OutputFormat::Json => print!("{}", to_json(&output)?),
        OutputFormat::Text | OutputFormat::Markdown => {
            println!("Navigation graph ready:");
            println!("  Dataset: {}", output.dataset);
            println!("  Cache: {}", output.cache);
            println!("  Nodes: {} ({} walkable)", output.nodes, output.walkable);
            println!("  Edges: {}", output.edges);
            println!("  Hazard zones: {}", output.hazard_zones);
        }
    }
    Ok(())
}

//! Port directory command handler.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use seaway_lib::{Coordinate, PortDirectory};

use crate::output::{to_json, OutputFormat};

#[derive(Debug, Clone, Serialize)]
struct PortEntry<'a> {
    name: &'a str,
    coordinate: Coordinate,
}

/// List every port, or resolve a single name when `lookup` is given.
pub fn handle_ports(path: &Path, lookup: Option<&str>, format: OutputFormat) -> Result<()> {
    let ports = PortDirectory::from_path(path)
        .with_context(|| format!("failed to load ports from {}", path.display()))?;

    let entries: Vec<PortEntry<'_>> = match lookup {
        Some(name) => vec![PortEntry {
            name,
            coordinate: ports.resolve(name)?,
        }],
        None => ports
            .iter()
            .map(|(name, coordinate)| PortEntry { name, coordinate })
            .collect(),
    };

    match format {
        OutputFormat::Json => print!("{}", to_json(&entries)?),
        OutputFormat::Text | OutputFormat::Markdown => {
            for entry in &entries {
                println!("{} {}", entry.name, entry.coordinate);
            }
        }
    }
    Ok(())
}

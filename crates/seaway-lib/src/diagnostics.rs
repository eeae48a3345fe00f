//! Connectivity diagnostics: isolated nodes, connected components, a spatial
//! breakdown of isolated nodes, and a resumable export of their coordinates.

use std::collections::{BTreeSet, VecDeque};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::node::{Node, NodeId};

/// Rows and columns used by the default bucket report.
pub const DEFAULT_BUCKETS: (usize, usize) = (4, 4);

/// Isolated-node count for one cell of the graph's bounding box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub row: usize,
    pub col: usize,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
    pub isolated: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsReport {
    pub node_count: usize,
    pub edge_count: usize,
    pub isolated_count: usize,
    pub component_count: usize,
    pub is_connected: bool,
    pub buckets: Vec<Bucket>,
}

/// Outcome of one [`export_isolated`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Offset read from the checkpoint before this run.
    pub resumed_from: usize,
    /// Lines appended by this run.
    pub written: usize,
    pub total: usize,
}

/// Nodes with no adjacency, ordered by id.
pub fn isolated_nodes(graph: &Graph) -> BTreeSet<NodeId> {
    graph
        .nodes()
        .filter(|node| node.is_isolated())
        .map(Node::id)
        .collect()
}

/// Number of connected components among walkable nodes.
///
/// Blocked nodes are neither roots nor stepping stones, so a hazard zone that
/// cuts a region splits it. An isolated walkable node counts as its own
/// component.
pub fn connected_components(graph: &Graph) -> usize {
    let walkable: Vec<bool> = graph.nodes().map(|node| node.walkable).collect();
    let mut seen = vec![false; walkable.len()];
    let mut queue = VecDeque::new();
    let mut components = 0usize;

    for root in 0..walkable.len() {
        if seen[root] || !walkable[root] {
            continue;
        }
        components += 1;
        seen[root] = true;
        queue.push_back(root as NodeId);

        while let Some(current) = queue.pop_front() {
            for edge in graph.neighbours(current) {
                let next = edge.target as usize;
                if next < seen.len() && walkable[next] && !seen[next] {
                    seen[next] = true;
                    queue.push_back(edge.target);
                }
            }
        }
    }
    components
}

/// True when there are walkable nodes and all of them form one component.
pub fn is_connected(graph: &Graph) -> bool {
    connected_components(graph) == 1
}

/// Split the node bounding box into `rows x cols` cells and count the isolated
/// nodes in each. Cells are half-open except along the upper edges, which
/// belong to the last row/column.
pub fn bucket_report(graph: &Graph, rows: usize, cols: usize) -> Vec<Bucket> {
    let (rows, cols) = (rows.max(1), cols.max(1));
    let Some((min, max)) = graph.bounds() else {
        return Vec::new();
    };
    let lat_edges = edges(min.lat, max.lat, rows);
    let lon_edges = edges(min.lon, max.lon, cols);

    let mut buckets = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            buckets.push(Bucket {
                row,
                col,
                lat_min: lat_edges[row],
                lat_max: lat_edges[row + 1],
                lon_min: lon_edges[col],
                lon_max: lon_edges[col + 1],
                isolated: 0,
            });
        }
    }

    for node in graph.nodes().filter(|node| node.is_isolated()) {
        let coordinate = node.coordinate();
        let row = cell(coordinate.lat, min.lat, max.lat, rows);
        let col = cell(coordinate.lon, min.lon, max.lon, cols);
        buckets[row * cols + col].isolated += 1;
    }
    buckets
}

fn edges(min: f64, max: f64, parts: usize) -> Vec<f64> {
    (0..=parts)
        .map(|i| min + (max - min) * i as f64 / parts as f64)
        .collect()
}

fn cell(value: f64, min: f64, max: f64, parts: usize) -> usize {
    if max <= min {
        return 0;
    }
    let index = ((value - min) / (max - min) * parts as f64).floor() as usize;
    index.min(parts - 1)
}

/// Summary counts plus the bucket breakdown.
pub fn diagnose(graph: &Graph, rows: usize, cols: usize) -> DiagnosticsReport {
    let isolated_count = graph.nodes().filter(|node| node.is_isolated()).count();
    let component_count = connected_components(graph);
    let report = DiagnosticsReport {
        node_count: graph.len(),
        edge_count: graph.edge_count(),
        isolated_count,
        component_count,
        is_connected: component_count == 1,
        buckets: bucket_report(graph, rows, cols),
    };

    info!(
        nodes = report.node_count,
        isolated = report.isolated_count,
        components = report.component_count,
        connected = report.is_connected,
        "graph diagnostics"
    );
    for bucket in report.buckets.iter().filter(|bucket| bucket.isolated > 0) {
        debug!(
            row = bucket.row,
            col = bucket.col,
            isolated = bucket.isolated,
            "isolated nodes in bucket"
        );
    }
    report
}

/// Append `lat,lon` lines for isolated nodes to `output`, `batch_size` at a
/// time, starting after the offset stored in `checkpoint`.
///
/// The checkpoint is rewritten only after a batch has been flushed, so an
/// interrupted run resumes without losing lines.
pub fn export_isolated(
    graph: &Graph,
    output: &Path,
    checkpoint: &Path,
    batch_size: usize,
) -> Result<ExportSummary> {
    let isolated: Vec<NodeId> = isolated_nodes(graph).into_iter().collect();
    let total = isolated.len();
    let mut offset = read_checkpoint(checkpoint)?;
    if offset > total {
        warn!(
            checkpoint = offset,
            total,
            "checkpoint is past the isolated node count"
        );
        offset = total;
    }
    let resumed_from = offset;
    if offset > 0 {
        debug!(offset, total, "resuming isolated node export");
    }

    let file = OpenOptions::new().create(true).append(true).open(output)?;
    let mut writer = BufWriter::new(file);

    for batch in isolated[offset..].chunks(batch_size.max(1)) {
        for &id in batch {
            let coordinate = graph.require(id)?.coordinate();
            writeln!(writer, "{},{}", coordinate.lat, coordinate.lon)?;
        }
        writer.flush()?;
        writer.get_ref().sync_data()?;

        offset += batch.len();
        write_checkpoint(checkpoint, offset)?;
        debug!(exported = offset, total, "isolated node batch written");
    }

    info!(
        written = offset - resumed_from,
        total,
        output = %output.display(),
        "isolated node export complete"
    );
    Ok(ExportSummary {
        resumed_from,
        written: offset - resumed_from,
        total,
    })
}

/// Stored offset, or `0` when no checkpoint exists yet.
pub fn read_checkpoint(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Ok(0);
    }
    let raw = fs::read_to_string(path)?;
    raw.trim().parse().map_err(|_| Error::Checkpoint {
        path: path.to_path_buf(),
        message: format!("expected a non-negative integer, found {:?}", raw.trim()),
    })
}

fn write_checkpoint(path: &Path, offset: usize) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    write!(file, "{offset}")?;
    file.flush()?;
    file.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

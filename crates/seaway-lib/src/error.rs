//! Library error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::coord::Coordinate;

/// Convenient result alias for the seaway library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Latitude or longitude outside of `[-90, 90]` / `[-180, 180]`, or not finite.
    #[error("invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },

    /// The graph has no navigable nodes at all.
    #[error("navigation graph has no navigable nodes")]
    EmptyGraph,

    /// Snapping a requested coordinate to the graph failed within the radius.
    #[error("no navigable node within {radius_km} km of {coordinate}")]
    NoNavigableNodeNearby {
        coordinate: Coordinate,
        radius_km: f64,
    },

    /// A resolved node id is absent from the graph arena.
    #[error("node {id} is not part of the navigation graph")]
    NodeNotInGraph { id: u32 },

    /// Search exhausted the open set without reaching the goal.
    #[error("no sea route found between {start} and {goal}")]
    NoPathFound { start: Coordinate, goal: Coordinate },

    /// Search stopped after reaching the caller's expansion limit.
    #[error("search stopped after expanding {expanded} nodes")]
    SearchLimitReached { expanded: usize },

    /// Predecessor walk did not terminate at the start node.
    #[error("path reconstruction did not reach start node {start}")]
    InvalidPath { start: u32 },

    /// Raised when an edge would violate the adjacency invariants.
    #[error("invalid edge {from} -> {to}: {message}")]
    InvalidEdge { from: u32, to: u32, message: String },

    /// Land or coastline geometry failed validation.
    #[error("invalid geometry: {message}")]
    InvalidGeometry { message: String },

    /// Lattice bounds or spacing cannot produce a grid.
    #[error("invalid lattice: {message}")]
    InvalidLattice { message: String },

    /// Raised when a port name could not be found in the directory.
    #[error("unknown port name: {name}{}", format_suggestions(.suggestions))]
    UnknownPort {
        name: String,
        suggestions: Vec<String>,
    },

    /// Raised when a build configuration file cannot be used.
    #[error("invalid configuration at {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Raised when platform-specific project directories cannot be resolved.
    #[error("could not determine a cache directory for this platform")]
    ProjectDirsUnavailable,

    /// Raised when serializing a graph cache blob fails.
    #[error("failed to serialize graph cache: {message}")]
    CacheSerialize { message: String },

    /// Raised when a cached graph blob cannot be used.
    #[error("failed to load graph cache from {path}: {message}")]
    CacheLoad { path: PathBuf, message: String },

    /// Raised when a diagnostic export checkpoint is unreadable.
    #[error("invalid checkpoint at {path}: {message}")]
    Checkpoint { path: PathBuf, message: String },

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for JSON parsing errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for outcomes the caller may recover from by changing the request
    /// (widening the snap radius, lifting the expansion limit, ...).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NoNavigableNodeNearby { .. }
                | Error::NoPathFound { .. }
                | Error::SearchLimitReached { .. }
                | Error::CacheLoad { .. }
        )
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else if suggestions.len() == 1 {
        format!(". Did you mean '{}'?", suggestions[0])
    } else {
        format!(
            ". Did you mean one of: {}?",
            suggestions
                .iter()
                .map(|s| format!("'{}'", s))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_port_lists_suggestions() {
        let err = Error::UnknownPort {
            name: "Roterdam".to_string(),
            suggestions: vec!["Rotterdam".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "unknown port name: Roterdam. Did you mean 'Rotterdam'?"
        );

        let err = Error::UnknownPort {
            name: "Port".to_string(),
            suggestions: vec!["Porto".to_string(), "Portland".to_string()],
        };
        assert!(err.to_string().ends_with("one of: 'Porto', 'Portland'?"));
    }

    #[test]
    fn no_path_is_recoverable_but_empty_graph_is_not() {
        let start = Coordinate::new(0.0, 0.0).unwrap();
        let goal = Coordinate::new(1.0, 1.0).unwrap();
        assert!(Error::NoPathFound { start, goal }.is_recoverable());
        assert!(!Error::EmptyGraph.is_recoverable());
    }
}

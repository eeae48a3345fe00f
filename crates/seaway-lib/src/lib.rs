//! Seaway library entry points.
//!
//! This crate classifies a coordinate lattice against land geometry, builds a
//! navigation graph over the open-water points, caches that graph on disk, and
//! plans sea routes over it with A* or Dijkstra. Higher-level consumers (the
//! CLI, long-running services) should only depend on the functions exported
//! here instead of reimplementing behavior.
//!

pub mod builder;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod coord;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod handle;
pub mod lattice;
pub mod node;
pub mod output;
pub mod path;
pub mod ports;
pub mod routing;
pub mod spatial;

pub use builder::{BuildStats, Corridor, GraphBuilder, HazardConfig, NeighborStrategy};
pub use cache::{build_from_dataset, load_or_build_graph, source_key, GraphCache, SourceKey};
pub use classifier::{GeometryOracle, LandMask, OpenWater, Terrain};
pub use config::{default_cache_path, BuildConfig};
pub use coord::{haversine_km, Coordinate};
pub use diagnostics::{
    connected_components, diagnose, export_isolated, is_connected, isolated_nodes,
    DiagnosticsReport, ExportSummary,
};
pub use error::{Error, Result};
pub use graph::{Graph, HazardZone};
pub use handle::GraphHandle;
pub use lattice::{ClassifiedLattice, LatticeSpec};
pub use node::{Edge, Node, NodeId};
pub use output::{RouteRenderMode, RouteSummary};
pub use path::{
    find_route_a_star, find_route_dijkstra, RoutePath, SearchConstraints, SearchOutcome,
    SearchReport,
};
pub use ports::PortDirectory;
pub use routing::{route, RouteAlgorithm, RoutePlan, RouteRequest, DEFAULT_SNAP_RADIUS_KM};

//! Route planning between arbitrary coordinates.
//!
//! This module provides:
//! - [`RouteAlgorithm`] - Supported search algorithms (A*, Dijkstra)
//! - [`RouteRequest`] - Coordinates plus per-query search options
//! - [`RoutePlan`] - Resolved route result
//! - [`route`] - Main entry point: snap endpoints, search, reconstruct
//!
//! # Example
//!
//! ```ignore
//! use seaway_lib::{route, Coordinate, RouteRequest};
//!
//! let request = RouteRequest::new(
//!     Coordinate::new(51.95, 4.14)?,
//!     Coordinate::new(40.68, -74.01)?,
//! );
//! let plan = route(&graph, &request)?;
//! println!("{:.1} km in {} hops", plan.length_km(), plan.hop_count());
//! ```

mod planner;

pub use planner::{select_planner, AStarPlanner, DijkstraPlanner, RoutePlanner};

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::node::NodeId;
use crate::path::{RoutePath, SearchConstraints, SearchOutcome};

/// Default search radius when snapping a coordinate onto the graph.
pub const DEFAULT_SNAP_RADIUS_KM: f64 = 50.0;

/// Supported search algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RouteAlgorithm {
    /// A* search guided by great-circle distance to the goal.
    #[default]
    #[serde(rename = "a-star")]
    AStar,
    /// Dijkstra's algorithm (uninformed, same optimal length).
    Dijkstra,
}

impl fmt::Display for RouteAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            RouteAlgorithm::AStar => "a-star",
            RouteAlgorithm::Dijkstra => "dijkstra",
        };
        f.write_str(value)
    }
}

/// High-level route request.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub start: Coordinate,
    pub goal: Coordinate,
    pub algorithm: RouteAlgorithm,
    /// Avoid intermediate nodes closer than this to the coast. `0` disables.
    pub coastal_threshold_km: f64,
    /// Maximum distance between a requested coordinate and its snapped node.
    pub snap_radius_km: f64,
    pub max_expansions: Option<usize>,
}

impl RouteRequest {
    /// A* request with default options.
    pub fn new(start: Coordinate, goal: Coordinate) -> Self {
        Self {
            start,
            goal,
            algorithm: RouteAlgorithm::AStar,
            coastal_threshold_km: 0.0,
            snap_radius_km: DEFAULT_SNAP_RADIUS_KM,
            max_expansions: None,
        }
    }

    pub fn with_algorithm(mut self, algorithm: RouteAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_coastal_threshold(mut self, km: f64) -> Self {
        self.coastal_threshold_km = km;
        self
    }

    pub fn with_snap_radius(mut self, km: f64) -> Self {
        self.snap_radius_km = km;
        self
    }

    pub fn with_max_expansions(mut self, limit: Option<usize>) -> Self {
        self.max_expansions = limit;
        self
    }

    fn search_constraints(&self) -> SearchConstraints {
        SearchConstraints {
            coastal_threshold_km: self.coastal_threshold_km.max(0.0),
            max_expansions: self.max_expansions,
        }
    }
}

/// Planned route returned by the library.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    pub algorithm: RouteAlgorithm,
    pub requested_start: Coordinate,
    pub requested_goal: Coordinate,
    /// Graph node the start coordinate snapped to.
    pub start: NodeId,
    pub goal: NodeId,
    pub path: RoutePath,
    /// Nodes expanded by the search.
    pub expanded: usize,
}

impl RoutePlan {
    /// Number of hops in the route.
    pub fn hop_count(&self) -> usize {
        self.path.hops()
    }

    pub fn length_km(&self) -> f64 {
        self.path.length_km
    }
}

/// Snap both endpoints, run the requested algorithm, and reconstruct the path.
pub fn route(graph: &Graph, request: &RouteRequest) -> Result<RoutePlan> {
    for coordinate in [request.start, request.goal] {
        if !coordinate.is_valid() {
            return Err(Error::InvalidCoordinate {
                lat: coordinate.lat,
                lon: coordinate.lon,
            });
        }
    }
    if graph.walkable_count() == 0 {
        return Err(Error::EmptyGraph);
    }

    let start = resolve_endpoint(graph, &request.start, request.snap_radius_km)?;
    let goal = resolve_endpoint(graph, &request.goal, request.snap_radius_km)?;

    let planner = select_planner(request.algorithm);
    let report = planner.find_path(graph, start, goal, &request.search_constraints())?;

    let nodes = match report.outcome {
        SearchOutcome::Found(nodes) => nodes,
        SearchOutcome::Exhausted => {
            return Err(Error::NoPathFound {
                start: request.start,
                goal: request.goal,
            })
        }
        SearchOutcome::LimitReached => {
            return Err(Error::SearchLimitReached {
                expanded: report.expanded,
            })
        }
    };
    let path = RoutePath::from_nodes(graph, nodes)?;

    info!(
        algorithm = %planner.algorithm(),
        hops = path.hops(),
        length_km = path.length_km,
        expanded = report.expanded,
        "route planned"
    );

    Ok(RoutePlan {
        algorithm: planner.algorithm(),
        requested_start: request.start,
        requested_goal: request.goal,
        start,
        goal,
        path,
        expanded: report.expanded,
    })
}

/// Exact node at the coordinate when it is walkable, otherwise the nearest
/// walkable node within `snap_radius_km`.
pub fn resolve_endpoint(
    graph: &Graph,
    coordinate: &Coordinate,
    snap_radius_km: f64,
) -> Result<NodeId> {
    if let Some(id) = graph.node_id(coordinate) {
        if graph.node(id).is_some_and(|node| node.walkable) {
            return Ok(id);
        }
    }

    let (id, distance_km) = graph
        .nearest_walkable(coordinate, snap_radius_km)
        .ok_or(Error::NoNavigableNodeNearby {
            coordinate: *coordinate,
            radius_km: snap_radius_km,
        })?;
    debug!(
        requested = %coordinate,
        node = id,
        distance_km,
        "snapped endpoint to navigable node"
    );
    Ok(id)
}

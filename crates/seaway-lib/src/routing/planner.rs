//! Route planning strategies.
//!
//! Each search algorithm sits behind the [`RoutePlanner`] trait so the
//! orchestration in [`route`](super::route) never branches on the algorithm.

use crate::error::Result;
use crate::graph::Graph;
use crate::node::NodeId;
use crate::path::{find_route_a_star, find_route_dijkstra, SearchConstraints, SearchReport};

use super::RouteAlgorithm;

pub trait RoutePlanner: Send + Sync {
    fn algorithm(&self) -> RouteAlgorithm;

    /// Search between two resolved node ids.
    fn find_path(
        &self,
        graph: &Graph,
        start: NodeId,
        goal: NodeId,
        constraints: &SearchConstraints,
    ) -> Result<SearchReport>;
}

/// Heuristic-guided search; the default for interactive routing.
#[derive(Debug, Clone, Default)]
pub struct AStarPlanner;

impl RoutePlanner for AStarPlanner {
    fn algorithm(&self) -> RouteAlgorithm {
        RouteAlgorithm::AStar
    }

    fn find_path(
        &self,
        graph: &Graph,
        start: NodeId,
        goal: NodeId,
        constraints: &SearchConstraints,
    ) -> Result<SearchReport> {
        find_route_a_star(graph, start, goal, constraints)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DijkstraPlanner;

impl RoutePlanner for DijkstraPlanner {
    fn algorithm(&self) -> RouteAlgorithm {
        RouteAlgorithm::Dijkstra
    }

    fn find_path(
        &self,
        graph: &Graph,
        start: NodeId,
        goal: NodeId,
        constraints: &SearchConstraints,
    ) -> Result<SearchReport> {
        find_route_dijkstra(graph, start, goal, constraints)
    }
}

/// Planner implementing `algorithm`.
pub fn select_planner(algorithm: RouteAlgorithm) -> Box<dyn RoutePlanner> {
    match algorithm {
        RouteAlgorithm::AStar => Box::new(AStarPlanner),
        RouteAlgorithm::Dijkstra => Box::new(DijkstraPlanner),
    }
}

//! Best-first search (A* and Dijkstra) over the navigation graph.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::classifier::{is_within_threshold, Terrain};
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::node::{Node, NodeId};

/// Per-query restrictions applied while expanding the search frontier.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchConstraints {
    /// Nodes whose recorded coast distance is below this are not entered. The
    /// goal is exempt. `0` disables the check.
    pub coastal_threshold_km: f64,
    /// Stop after expanding this many nodes.
    pub max_expansions: Option<usize>,
}

impl SearchConstraints {
    fn allows(&self, node: &Node, goal: NodeId) -> bool {
        if !node.is_valid() {
            warn!(
                node = node.id(),
                coordinate = %node.coordinate(),
                "skipping node with invalid coordinate"
            );
            return false;
        }
        if !node.walkable {
            return false;
        }
        node.id() == goal
            || !is_within_threshold(node.coast_distance_km, self.coastal_threshold_km)
    }
}

/// Terminal state of a search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Node ids from start to goal inclusive.
    Found(Vec<NodeId>),
    /// The frontier emptied without reaching the goal.
    Exhausted,
    /// `max_expansions` was hit first.
    LimitReached,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    pub outcome: SearchOutcome,
    /// Nodes popped and expanded.
    pub expanded: usize,
}

/// A resolved route through the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePath {
    pub nodes: Vec<NodeId>,
    pub coordinates: Vec<Coordinate>,
    /// Sum of the great-circle lengths of consecutive legs.
    pub length_km: f64,
}

impl RoutePath {
    pub fn from_nodes(graph: &Graph, nodes: Vec<NodeId>) -> Result<Self> {
        let coordinates = nodes
            .iter()
            .map(|&id| graph.require(id).map(Node::coordinate))
            .collect::<Result<Vec<_>>>()?;
        let length_km = coordinates
            .windows(2)
            .map(|leg| leg[0].distance_km(&leg[1]))
            .sum();
        Ok(Self {
            nodes,
            coordinates,
            length_km,
        })
    }

    /// Number of edges traversed.
    pub fn hops(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

/// A* search with the great-circle distance to the goal as heuristic.
pub fn find_route_a_star(
    graph: &Graph,
    start: NodeId,
    goal: NodeId,
    constraints: &SearchConstraints,
) -> Result<SearchReport> {
    let goal_coordinate = graph.require(goal)?.coordinate();
    search(graph, start, goal, constraints, |node| {
        node.coordinate().distance_km(&goal_coordinate)
    })
}

/// Dijkstra's algorithm: the same expansion as A* with a zero heuristic. Every
/// node reaching the frontier is classified at `trace` level.
pub fn find_route_dijkstra(
    graph: &Graph,
    start: NodeId,
    goal: NodeId,
    constraints: &SearchConstraints,
) -> Result<SearchReport> {
    search(graph, start, goal, constraints, |node| {
        trace!(
            node = node.id(),
            coordinate = %node.coordinate(),
            terrain = ?Terrain::of_node(node, constraints.coastal_threshold_km),
            "classified frontier node"
        );
        0.0
    })
}

fn search<H>(
    graph: &Graph,
    start: NodeId,
    goal: NodeId,
    constraints: &SearchConstraints,
    heuristic: H,
) -> Result<SearchReport>
where
    H: Fn(&Node) -> f64,
{
    let start_node = graph.require(start)?;
    graph.require(goal)?;

    if start == goal {
        return Ok(SearchReport {
            outcome: SearchOutcome::Found(vec![start]),
            expanded: 0,
        });
    }

    let mut g_score = vec![f64::INFINITY; graph.len()];
    let mut parents: Vec<Option<NodeId>> = vec![None; graph.len()];
    let mut closed = vec![false; graph.len()];
    let mut queue = BinaryHeap::new();
    let mut expanded = 0usize;

    g_score[start as usize] = 0.0;
    queue.push(QueueEntry::new(start, 0.0, heuristic(start_node)));

    while let Some(entry) = queue.pop() {
        let current = entry.node as usize;
        if closed[current] {
            continue;
        }

        if entry.node == goal {
            debug!(start, goal, expanded, "search reached goal");
            let path = reconstruct_path(&parents, start, goal)?;
            return Ok(SearchReport {
                outcome: SearchOutcome::Found(path),
                expanded,
            });
        }

        if constraints
            .max_expansions
            .is_some_and(|limit| expanded >= limit)
        {
            debug!(start, goal, expanded, "search hit expansion limit");
            return Ok(SearchReport {
                outcome: SearchOutcome::LimitReached,
                expanded,
            });
        }

        closed[current] = true;
        expanded += 1;
        let current_score = g_score[current];

        for edge in graph.neighbours(entry.node) {
            let next = edge.target;
            let Some(next_node) = graph.node(next) else {
                continue;
            };
            if closed[next as usize] || !constraints.allows(next_node, goal) {
                continue;
            }

            let tentative = current_score + edge.distance_km;
            if tentative < g_score[next as usize] {
                g_score[next as usize] = tentative;
                parents[next as usize] = Some(entry.node);
                queue.push(QueueEntry::new(next, tentative, heuristic(next_node)));
            }
        }
    }

    debug!(start, goal, expanded, "search exhausted frontier");
    Ok(SearchReport {
        outcome: SearchOutcome::Exhausted,
        expanded,
    })
}

fn reconstruct_path(
    parents: &[Option<NodeId>],
    start: NodeId,
    goal: NodeId,
) -> Result<Vec<NodeId>> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        // a walk longer than the arena means the predecessor chain loops
        if path.len() > parents.len() {
            return Err(Error::InvalidPath { start });
        }
        current = parents
            .get(current as usize)
            .copied()
            .flatten()
            .ok_or(Error::InvalidPath { start })?;
        path.push(current);
    }
    path.reverse();
    Ok(path)
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq(&other.0)
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct QueueEntry {
    node: NodeId,
    estimate: FloatOrd,
}

impl QueueEntry {
    fn new(node: NodeId, cost: f64, heuristic: f64) -> Self {
        Self {
            node,
            estimate: FloatOrd(cost + heuristic),
        }
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap becomes a min-heap; equal estimates pop
        // the lower node id first.
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinate(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    /// 0 - 1 - 2 along the equator plus a detour 0 - 3 - 2 to the north.
    fn diamond() -> Graph {
        let mut graph = Graph::default();
        for (lat, lon) in [(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (1.0, 1.0)] {
            graph.add_node(coordinate(lat, lon)).unwrap();
        }
        for (a, b) in [(0, 1), (1, 2), (0, 3), (3, 2)] {
            graph.connect(a, b).unwrap();
        }
        graph.rebuild_index();
        graph
    }

    fn found(report: SearchReport) -> Vec<NodeId> {
        match report.outcome {
            SearchOutcome::Found(path) => path,
            other => panic!("expected a path, got {other:?}"),
        }
    }

    #[test]
    fn a_star_prefers_shorter_leg() {
        let graph = diamond();
        let report = find_route_a_star(&graph, 0, 2, &SearchConstraints::default()).unwrap();
        let path = found(report);
        assert_eq!(path, vec![0, 1, 2]);
    }

    #[test]
    fn dijkstra_matches_a_star() {
        let graph = diamond();
        let constraints = SearchConstraints::default();
        let a = found(find_route_a_star(&graph, 0, 2, &constraints).unwrap());
        let d = found(find_route_dijkstra(&graph, 0, 2, &constraints).unwrap());
        assert_eq!(a, d);
    }

    #[test]
    fn blocked_node_forces_detour() {
        let mut graph = diamond();
        graph.mark_unwalkable(1).unwrap();
        let report = find_route_a_star(&graph, 0, 2, &SearchConstraints::default()).unwrap();
        let path = found(report);
        assert_eq!(path, vec![0, 3, 2]);
    }

    #[test]
    fn coastal_threshold_skips_near_shore_nodes_but_not_goal() {
        let mut graph = diamond();
        graph.set_coast_distance(1, Some(2.0)).unwrap();
        graph.set_coast_distance(2, Some(1.0)).unwrap();
        let constraints = SearchConstraints {
            coastal_threshold_km: 5.0,
            max_expansions: None,
        };
        let path = found(find_route_a_star(&graph, 0, 2, &constraints).unwrap());
        assert_eq!(path, vec![0, 3, 2]);
    }

    #[test]
    fn exhausted_when_goal_unreachable() {
        let mut graph = diamond();
        graph.mark_unwalkable(1).unwrap();
        graph.mark_unwalkable(3).unwrap();
        let report = find_route_dijkstra(&graph, 0, 2, &SearchConstraints::default()).unwrap();
        assert_eq!(report.outcome, SearchOutcome::Exhausted);
        assert_eq!(report.expanded, 1);
    }

    #[test]
    fn expansion_limit_is_reported() {
        let graph = diamond();
        let constraints = SearchConstraints {
            coastal_threshold_km: 0.0,
            max_expansions: Some(1),
        };
        let report = find_route_a_star(&graph, 0, 2, &constraints).unwrap();
        assert_eq!(report.outcome, SearchOutcome::LimitReached);
        assert_eq!(report.expanded, 1);
    }

    #[test]
    fn start_equals_goal() {
        let graph = diamond();
        let report = find_route_a_star(&graph, 3, 3, &SearchConstraints::default()).unwrap();
        assert_eq!(report.outcome, SearchOutcome::Found(vec![3]));
    }

    #[test]
    fn unknown_node_is_an_error() {
        let graph = diamond();
        assert!(matches!(
            find_route_a_star(&graph, 0, 42, &SearchConstraints::default()),
            Err(Error::NodeNotInGraph { id: 42 })
        ));
    }

    #[test]
    fn broken_predecessor_chain_is_invalid() {
        let parents = vec![None, Some(2), Some(1)];
        assert!(matches!(
            reconstruct_path(&parents, 0, 2),
            Err(Error::InvalidPath { start: 0 })
        ));
        let parents = vec![None, None, Some(1)];
        assert!(matches!(
            reconstruct_path(&parents, 0, 2),
            Err(Error::InvalidPath { .. })
        ));
    }

    #[test]
    fn route_path_sums_leg_lengths() {
        let graph = diamond();
        let path = RoutePath::from_nodes(&graph, vec![0, 1, 2]).unwrap();
        assert_eq!(path.hops(), 2);
        let expected = graph.neighbours(0)[0].distance_km + graph.neighbours(1)[1].distance_km;
        assert!((path.length_km - expected).abs() < 1e-9);
    }
}

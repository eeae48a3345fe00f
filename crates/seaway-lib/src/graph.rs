//! Navigation graph arena with a coordinate lookup and a spatial index.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::coord::{CoordKey, Coordinate, DEFAULT_RESOLUTION_DEG};
use crate::error::{Error, Result};
use crate::node::{Edge, Node, NodeId};
use crate::spatial::SpatialIndex;

/// Nodes marked non-walkable around a sampled hazard point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardZone {
    pub center: Coordinate,
    pub nodes: Vec<NodeId>,
}

/// Navigation graph: an arena of nodes with index-based adjacency plus a
/// KD-tree over node coordinates.
///
/// The graph is mutated only while it is being built. Once handed to search it
/// is treated as read-only and can be shared between threads behind an `Arc`.
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<Node>,
    lookup: HashMap<CoordKey, NodeId>,
    index: SpatialIndex,
    index_stale: bool,
    hazards: Vec<HazardZone>,
    resolution_deg: f64,
}

impl Graph {
    /// Empty graph whose node identity uses `resolution_deg` rounding.
    pub fn new(resolution_deg: f64) -> Self {
        Self {
            nodes: Vec::new(),
            lookup: HashMap::new(),
            index: SpatialIndex::default(),
            index_stale: false,
            hazards: Vec::new(),
            resolution_deg,
        }
    }

    /// Reassemble a graph from stored nodes, rebuilding lookups and the index.
    pub fn from_parts(
        nodes: Vec<Node>,
        hazards: Vec<HazardZone>,
        resolution_deg: f64,
    ) -> Result<Self> {
        let mut lookup = HashMap::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            if node.id() as usize != position {
                return Err(Error::NodeNotInGraph { id: node.id() });
            }
            if lookup.insert(node.key(), node.id()).is_some() {
                return Err(Error::InvalidEdge {
                    from: node.id(),
                    to: node.id(),
                    message: format!("duplicate node at {}", node.coordinate()),
                });
            }
            for edge in node.edges() {
                if edge.target as usize >= nodes.len() {
                    return Err(Error::NodeNotInGraph { id: edge.target });
                }
            }
        }

        let mut graph = Self {
            nodes,
            lookup,
            index: SpatialIndex::default(),
            index_stale: true,
            hazards,
            resolution_deg,
        };
        graph.rebuild_index();
        Ok(graph)
    }

    /// Rounding used for node identity.
    pub fn resolution(&self) -> f64 {
        self.resolution_deg
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(Node::degree).sum::<usize>() / 2
    }

    pub fn walkable_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.walkable).count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub(crate) fn node_slice(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    /// Like [`Graph::node`] but reports a missing id as an error.
    pub fn require(&self, id: NodeId) -> Result<&Node> {
        self.node(id).ok_or(Error::NodeNotInGraph { id })
    }

    fn require_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id as usize)
            .ok_or(Error::NodeNotInGraph { id })
    }

    /// Id of the node whose rounded coordinate equals `coordinate`'s.
    pub fn node_id(&self, coordinate: &Coordinate) -> Option<NodeId> {
        self.lookup
            .get(&coordinate.key(self.resolution_deg))
            .copied()
    }

    /// Return the neighbours for a given node.
    pub fn neighbours(&self, id: NodeId) -> &[Edge] {
        self.node(id).map(Node::edges).unwrap_or(&[])
    }

    /// Insert a node, or return the existing id when the rounded coordinate is
    /// already present. Marks the spatial index stale.
    pub fn add_node(&mut self, coordinate: Coordinate) -> Result<NodeId> {
        if let Some(existing) = self.node_id(&coordinate) {
            return Ok(existing);
        }

        let id = NodeId::try_from(self.nodes.len()).map_err(|_| Error::InvalidGeometry {
            message: "node count exceeds u32 range".to_string(),
        })?;
        let node = Node::with_resolution(id, coordinate, self.resolution_deg)?;
        self.lookup.insert(node.key(), id);
        self.nodes.push(node);
        self.index_stale = true;
        Ok(id)
    }

    /// Add a bidirectional edge weighted by great-circle distance.
    ///
    /// Returns `Ok(false)` without touching adjacency when either endpoint is
    /// non-walkable or the edge already exists.
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<bool> {
        let (from, to) = (self.require(a)?, self.require(b)?);
        if !from.walkable || !to.walkable || from.has_neighbor(b) {
            return Ok(false);
        }
        let distance = from.coordinate().distance_km(&to.coordinate());

        self.require_mut(a)?.add_neighbor(b, distance)?;
        self.require_mut(b)?.add_neighbor(a, distance)?;
        Ok(true)
    }

    /// Flag a node as non-walkable. Existing edges stay in place; search never
    /// expands through the node.
    pub fn mark_unwalkable(&mut self, id: NodeId) -> Result<()> {
        self.set_walkable(id, false)
    }

    pub fn set_walkable(&mut self, id: NodeId, walkable: bool) -> Result<()> {
        self.require_mut(id)?.walkable = walkable;
        Ok(())
    }

    /// Record the distance to the nearest coastline for a node.
    pub fn set_coast_distance(&mut self, id: NodeId, distance_km: Option<f64>) -> Result<()> {
        self.require_mut(id)?.coast_distance_km = distance_km;
        Ok(())
    }

    pub fn hazards(&self) -> &[HazardZone] {
        &self.hazards
    }

    pub(crate) fn push_hazard(&mut self, zone: HazardZone) {
        self.hazards.push(zone);
    }

    /// Coordinates of every node blocked by a hazard zone, for visualization.
    pub fn hazard_coordinates(&self) -> Vec<Coordinate> {
        self.hazards
            .iter()
            .flat_map(|zone| zone.nodes.iter())
            .filter_map(|&id| self.node(id).map(Node::coordinate))
            .collect()
    }

    /// Rebuild the KD-tree from the current node set.
    pub fn rebuild_index(&mut self) {
        let points: Vec<Coordinate> = self.nodes.iter().map(Node::coordinate).collect();
        self.index = SpatialIndex::build(&points);
        self.index_stale = false;
        debug!(nodes = points.len(), "rebuilt graph spatial index");
    }

    pub fn index_is_stale(&self) -> bool {
        self.index_stale
    }

    fn check_index(&self) {
        if self.index_stale {
            warn!("spatial query on a graph whose node set changed since the last index build");
        }
    }

    /// Up to `k` nearest nodes (any walkability), closest first.
    pub fn nearest_nodes(&self, coordinate: &Coordinate, k: usize) -> Vec<(NodeId, f64)> {
        self.check_index();
        self.index
            .nearest(coordinate, k)
            .into_iter()
            .map(|(index, distance)| (index as NodeId, distance))
            .collect()
    }

    /// All nodes within `radius_km`, closest first.
    pub fn nodes_within(&self, coordinate: &Coordinate, radius_km: f64) -> Vec<(NodeId, f64)> {
        self.check_index();
        self.index
            .within_radius(coordinate, radius_km)
            .into_iter()
            .map(|(index, distance)| (index as NodeId, distance))
            .collect()
    }

    /// Closest walkable node within `max_radius_km`.
    pub fn nearest_walkable(
        &self,
        coordinate: &Coordinate,
        max_radius_km: f64,
    ) -> Option<(NodeId, f64)> {
        self.check_index();
        let mut k = 8usize;
        loop {
            let candidates = self.index.nearest(coordinate, k);
            for &(index, distance) in &candidates {
                if distance > max_radius_km {
                    return None;
                }
                if self.nodes[index].walkable {
                    return Some((index as NodeId, distance));
                }
            }
            if candidates.len() < k || k >= self.index.len() {
                return None;
            }
            k = k.saturating_mul(4);
        }
    }

    /// Latitude/longitude bounding box of all nodes as `(min, max)`.
    pub fn bounds(&self) -> Option<(Coordinate, Coordinate)> {
        let mut iter = self.nodes.iter().map(Node::coordinate);
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(mut min, mut max), c| {
            min.lat = min.lat.min(c.lat);
            min.lon = min.lon.min(c.lon);
            max.lat = max.lat.max(c.lat);
            max.lon = max.lon.max(c.lon);
            (min, max)
        });
        Some((min, max))
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLUTION_DEG)
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.resolution_deg == other.resolution_deg
            && self.hazards == other.hazards
            && self.nodes.len() == other.nodes.len()
            && self.nodes.iter().zip(&other.nodes).all(|(a, b)| {
                a.id() == b.id()
                    && a.coordinate() == b.coordinate()
                    && a.walkable == b.walkable
                    && a.coast_distance_km == b.coast_distance_km
                    && a.edges() == b.edges()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinate(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn chain() -> Graph {
        let mut graph = Graph::default();
        let a = graph.add_node(coordinate(0.0, 0.0)).unwrap();
        let b = graph.add_node(coordinate(0.0, 1.0)).unwrap();
        let c = graph.add_node(coordinate(0.0, 2.0)).unwrap();
        graph.connect(a, b).unwrap();
        graph.connect(b, c).unwrap();
        graph.rebuild_index();
        graph
    }

    #[test]
    fn add_node_deduplicates_by_rounded_coordinate() {
        let mut graph = Graph::default();
        let a = graph.add_node(coordinate(10.0001, 20.0)).unwrap();
        let b = graph.add_node(coordinate(10.0, 19.9999)).unwrap();
        assert_eq!(a, b);
        assert_eq!(graph.len(), 1);
        assert!(graph.index_is_stale());
    }

    #[test]
    fn connect_is_symmetric_and_weighted_by_haversine() {
        let graph = chain();
        let ab = graph.neighbours(0)[0];
        let ba = graph.neighbours(1)[0];
        assert_eq!(ab.target, 1);
        assert_eq!(ba.target, 0);
        assert_eq!(ab.distance_km, ba.distance_km);

        let expected = graph
            .node(0)
            .unwrap()
            .coordinate()
            .distance_km(&graph.node(1).unwrap().coordinate());
        assert_eq!(ab.distance_km, expected);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn connect_skips_duplicates_and_blocked_nodes() {
        let mut graph = chain();
        assert!(!graph.connect(0, 1).unwrap());

        let d = graph.add_node(coordinate(1.0, 0.0)).unwrap();
        graph.mark_unwalkable(d).unwrap();
        assert!(!graph.connect(0, d).unwrap());
        assert!(graph.node(d).unwrap().is_isolated());

        assert!(matches!(
            graph.connect(0, 99),
            Err(Error::NodeNotInGraph { id: 99 })
        ));
    }

    #[test]
    fn nearest_walkable_skips_blocked_nodes() {
        let mut graph = chain();
        graph.mark_unwalkable(0).unwrap();

        let (id, _) = graph
            .nearest_walkable(&coordinate(0.0, 0.1), 500.0)
            .unwrap();
        assert_eq!(id, 1);
        assert!(graph.nearest_walkable(&coordinate(0.0, 0.1), 50.0).is_none());
    }

    #[test]
    fn from_parts_round_trips_structure() {
        let graph = chain();
        let nodes: Vec<Node> = graph.nodes().cloned().collect();
        let rebuilt = Graph::from_parts(nodes, Vec::new(), graph.resolution()).unwrap();
        assert_eq!(graph, rebuilt);
        assert!(!rebuilt.index_is_stale());
        assert_eq!(rebuilt.node_id(&coordinate(0.0, 2.0)), Some(2));
    }

    #[test]
    fn bounds_cover_all_nodes() {
        let graph = chain();
        let (min, max) = graph.bounds().unwrap();
        assert_eq!((min.lat, min.lon), (0.0, 0.0));
        assert_eq!((max.lat, max.lon), (0.0, 2.0));
        assert!(Graph::default().bounds().is_none());
    }
}

//! Graph vertices and weighted edges, keyed by rounded coordinates.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::coord::{CoordKey, Coordinate, DEFAULT_RESOLUTION_DEG};
use crate::error::{Error, Result};

/// Arena index of a node; stable for the lifetime of a graph.
pub type NodeId = u32;

/// Weighted adjacency entry. The weight is the great-circle distance between
/// the two endpoints in kilometres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub target: NodeId,
    pub distance_km: f64,
}

/// One navigable (or blocked) point of the lattice.
///
/// Equality and hashing only look at the coordinate key, so two nodes created
/// for the same rounded position are the same logical node regardless of id,
/// flags or adjacency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    coordinate: Coordinate,
    key: CoordKey,
    pub walkable: bool,
    /// Distance to the nearest coastline, recorded at build time when known.
    pub coast_distance_km: Option<f64>,
    edges: Vec<Edge>,
}

impl Node {
    /// Create a walkable node at the default grid resolution.
    pub fn new(id: NodeId, lat: f64, lon: f64) -> Result<Self> {
        Self::with_resolution(id, Coordinate::new(lat, lon)?, DEFAULT_RESOLUTION_DEG)
    }

    pub(crate) fn with_resolution(
        id: NodeId,
        coordinate: Coordinate,
        resolution_deg: f64,
    ) -> Result<Self> {
        if !coordinate.is_valid() {
            return Err(Error::InvalidCoordinate {
                lat: coordinate.lat,
                lon: coordinate.lon,
            });
        }
        let coordinate = coordinate.rounded(resolution_deg);
        Ok(Self {
            id,
            key: coordinate.key(resolution_deg),
            coordinate,
            walkable: true,
            coast_distance_km: None,
            edges: Vec::new(),
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn key(&self) -> CoordKey {
        self.key
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn degree(&self) -> usize {
        self.edges.len()
    }

    pub fn is_isolated(&self) -> bool {
        self.edges.is_empty()
    }

    /// Coordinate range check performed before search touches the node.
    pub fn is_valid(&self) -> bool {
        self.coordinate.is_valid()
    }

    pub fn has_neighbor(&self, other: NodeId) -> bool {
        self.edges.iter().any(|edge| edge.target == other)
    }

    /// Append a one-directional adjacency entry.
    ///
    /// The graph calls this for both endpoints; use
    /// [`Graph::connect`](crate::graph::Graph::connect) to keep edges symmetric.
    pub fn add_neighbor(&mut self, other: NodeId, weight_km: f64) -> Result<()> {
        if other == self.id {
            return Err(Error::InvalidEdge {
                from: self.id,
                to: other,
                message: "self loops are not allowed".to_string(),
            });
        }
        if !weight_km.is_finite() || weight_km < 0.0 {
            return Err(Error::InvalidEdge {
                from: self.id,
                to: other,
                message: format!("weight must be a non-negative distance, got {weight_km}"),
            });
        }
        self.edges.push(Edge {
            target: other,
            distance_km: weight_km,
        });
        Ok(())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

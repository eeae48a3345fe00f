//! KD-tree spatial index over geographic coordinates.
//!
//! Coordinates are converted to radians and projected onto the unit sphere
//! before insertion. Squared chord length on the sphere is monotone in
//! great-circle distance, so nearest-neighbour order and radius membership
//! match what a haversine ball tree would return, while the tree itself stays
//! a plain Euclidean `kiddo` KD-tree.
//!
//! The tree is append-hostile: callers rebuild it from scratch whenever the
//! underlying point set changes.

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;

use crate::coord::{km_to_squared_chord, squared_chord_to_km, Coordinate};

/// KD-tree bucket size (kiddo default).
const BUCKET_SIZE: usize = 32;

type Tree = KdTree<f64, usize, 3, BUCKET_SIZE, u32>;

/// Nearest-neighbour index returning positions into the slice it was built from.
pub struct SpatialIndex {
    tree: Tree,
    len: usize,
}

impl SpatialIndex {
    /// Build an index where item `i` refers to `points[i]`.
    pub fn build(points: &[Coordinate]) -> Self {
        let mut tree: Tree = KdTree::new();
        for (index, point) in points.iter().enumerate() {
            tree.add(&separated(point.to_unit_vector(), index), index);
        }
        Self {
            tree,
            len: points.len(),
        }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Up to `k` nearest items as `(index, distance_km)`, closest first.
    pub fn nearest(&self, point: &Coordinate, k: usize) -> Vec<(usize, f64)> {
        if k == 0 || self.is_empty() {
            return Vec::new();
        }

        self.tree
            .nearest_n::<SquaredEuclidean>(&point.to_unit_vector(), k.min(self.len))
            .into_iter()
            .map(|neighbor| (neighbor.item, squared_chord_to_km(neighbor.distance)))
            .collect()
    }

    /// The single closest item, if any.
    pub fn nearest_one(&self, point: &Coordinate) -> Option<(usize, f64)> {
        self.nearest(point, 1).into_iter().next()
    }

    /// All items within `radius_km` great-circle distance, closest first.
    pub fn within_radius(&self, point: &Coordinate, radius_km: f64) -> Vec<(usize, f64)> {
        if radius_km < 0.0 || self.is_empty() {
            return Vec::new();
        }

        let mut neighbors: Vec<(usize, f64)> = self
            .tree
            .within::<SquaredEuclidean>(&point.to_unit_vector(), km_to_squared_chord(radius_km))
            .into_iter()
            .map(|neighbor| (neighbor.item, squared_chord_to_km(neighbor.distance)))
            .filter(|(_, distance)| *distance <= radius_km)
            .collect();

        neighbors.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        neighbors
    }
}

/// Nudge a stored point by a sub-millimetre, index-dependent offset.
///
/// kiddo cannot split a bucket whose points all share one axis value, and
/// lattice rows share `z` (and meridians `x`/`y`) exactly.
fn separated(mut vector: [f64; 3], index: usize) -> [f64; 3] {
    const STEP: f64 = 1e-13;
    for (axis, prime) in [7919usize, 104_729, 1_299_709].into_iter().enumerate() {
        vector[axis] += (index.wrapping_mul(prime) % 4096) as f64 * STEP;
    }
    vector
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::build(&[])
    }
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("point_count", &self.len)
            .finish()
    }
}

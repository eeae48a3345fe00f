//! Navigation graph construction.
//!
//! Candidate water points become nodes, neighbour relations come from the
//! graph's KD-tree, and optional corridors and hazard zones are layered on top.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::GeometryOracle;
use crate::coord::{Coordinate, DEFAULT_RESOLUTION_DEG, KM_PER_DEGREE};
use crate::error::Result;
use crate::graph::{Graph, HazardZone};
use crate::lattice::percent;
use crate::node::NodeId;

/// How neighbour candidates are chosen for each node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NeighborStrategy {
    /// The `k` nearest nodes by great-circle distance.
    Nearest { k: usize },
    /// Every node within one lattice diagonal (`step * sqrt(2)`).
    LatticeRadius { step_deg: f64 },
}

impl Default for NeighborStrategy {
    fn default() -> Self {
        NeighborStrategy::Nearest { k: 4 }
    }
}

impl NeighborStrategy {
    /// Search radius of the lattice strategy in kilometres.
    pub fn radius_km(step_deg: f64) -> f64 {
        step_deg * std::f64::consts::SQRT_2 * KM_PER_DEGREE * (1.0 + 1e-6)
    }

    fn is_symmetric(&self) -> bool {
        matches!(self, NeighborStrategy::LatticeRadius { .. })
    }
}

/// A forced waypoint chain such as a canal or strait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corridor {
    pub name: String,
    pub waypoints: Vec<Coordinate>,
    /// Samples per leg, both leg endpoints included.
    #[serde(default = "default_points_per_leg")]
    pub points_per_leg: usize,
}

fn default_points_per_leg() -> usize {
    10
}

impl Corridor {
    pub fn new(name: impl Into<String>, waypoints: Vec<Coordinate>, points_per_leg: usize) -> Self {
        Self {
            name: name.into(),
            waypoints,
            points_per_leg,
        }
    }

    /// Linearly interpolated samples along every leg, in travel order.
    pub fn samples(&self) -> Vec<Coordinate> {
        let per_leg = self.points_per_leg.max(2);
        let mut samples = Vec::new();
        for leg in self.waypoints.windows(2) {
            let (from, to) = (leg[0], leg[1]);
            for step in 0..per_leg {
                if step == 0 && !samples.is_empty() {
                    continue;
                }
                let t = step as f64 / (per_leg - 1) as f64;
                samples.push(Coordinate {
                    lat: from.lat + (to.lat - from.lat) * t,
                    lon: from.lon + (to.lon - from.lon) * t,
                });
            }
        }
        if samples.is_empty() {
            samples.extend(self.waypoints.first().copied());
        }
        samples
    }
}

/// Random hazard zones injected after the edges are in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardConfig {
    pub count: usize,
    /// Nodes blocked around each sampled centre, the centre included.
    pub k: usize,
    pub seed: u64,
}

/// Counts gathered while building, mostly for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub candidates: usize,
    pub land_dropped: usize,
    pub coastal_blocked: usize,
    pub edges: usize,
    pub corridor_nodes: usize,
    pub hazard_nodes: usize,
}

pub struct GraphBuilder {
    strategy: NeighborStrategy,
    batch_size: usize,
    coastal_buffer_km: f64,
    resolution_deg: f64,
    corridors: Vec<Corridor>,
    hazards: Option<HazardConfig>,
    assume_water: bool,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self {
            strategy: NeighborStrategy::default(),
            batch_size: 1000,
            coastal_buffer_km: 0.0,
            resolution_deg: DEFAULT_RESOLUTION_DEG,
            corridors: Vec::new(),
            hazards: None,
            assume_water: false,
        }
    }
}

impl GraphBuilder {
    pub fn new(strategy: NeighborStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Keep candidates closer than `km` to the coast as blocked nodes. Zero disables.
    pub fn coastal_buffer_km(mut self, km: f64) -> Self {
        self.coastal_buffer_km = km.max(0.0);
        self
    }

    pub fn resolution_deg(mut self, resolution_deg: f64) -> Self {
        self.resolution_deg = resolution_deg;
        self
    }

    pub fn corridor(mut self, corridor: Corridor) -> Self {
        self.corridors.push(corridor);
        self
    }

    pub fn corridors(mut self, corridors: impl IntoIterator<Item = Corridor>) -> Self {
        self.corridors.extend(corridors);
        self
    }

    pub fn hazards(mut self, hazards: Option<HazardConfig>) -> Self {
        self.hazards = hazards;
        self
    }

    /// Skip the land test for candidates that were already classified as water.
    /// The oracle is still consulted for coastline distances.
    pub fn assume_water(mut self, assume_water: bool) -> Self {
        self.assume_water = assume_water;
        self
    }

    /// Build a graph from candidate points without progress reporting.
    pub fn build<O>(&self, oracle: &O, candidates: &[Coordinate]) -> Result<Graph>
    where
        O: GeometryOracle + ?Sized,
    {
        self.build_with_progress(oracle, candidates, |_, _| {})
            .map(|(graph, _)| graph)
    }

    /// Build a graph, calling `progress(processed, total)` after each batch of
    /// neighbour queries.
    pub fn build_with_progress<O, F>(
        &self,
        oracle: &O,
        candidates: &[Coordinate],
        mut progress: F,
    ) -> Result<(Graph, BuildStats)>
    where
        O: GeometryOracle + ?Sized,
        F: FnMut(usize, usize),
    {
        let mut stats = BuildStats {
            candidates: candidates.len(),
            ..BuildStats::default()
        };
        let mut graph = Graph::new(self.resolution_deg);

        for candidate in candidates {
            if !self.assume_water && oracle.is_land(candidate) {
                stats.land_dropped += 1;
                continue;
            }
            let id = graph.add_node(*candidate)?;
            let coast = oracle.coast_distance_km(candidate);
            graph.set_coast_distance(id, coast)?;
            if self.coastal_buffer_km > 0.0 && coast.is_some_and(|d| d < self.coastal_buffer_km) {
                graph.mark_unwalkable(id)?;
                stats.coastal_blocked += 1;
            }
        }
        graph.rebuild_index();

        stats.edges = self.connect_neighbours(&mut graph, &mut progress)?;

        for corridor in &self.corridors {
            stats.corridor_nodes += add_corridor(&mut graph, corridor)?;
            graph.rebuild_index();
        }

        if let Some(hazards) = self.hazards {
            stats.hazard_nodes = add_hazards(&mut graph, hazards)?;
        }

        info!(
            nodes = graph.len(),
            edges = graph.edge_count(),
            land_dropped = stats.land_dropped,
            coastal_blocked = stats.coastal_blocked,
            corridor_nodes = stats.corridor_nodes,
            hazard_nodes = stats.hazard_nodes,
            "navigation graph built"
        );
        Ok((graph, stats))
    }

    fn connect_neighbours<F>(&self, graph: &mut Graph, progress: &mut F) -> Result<usize>
    where
        F: FnMut(usize, usize),
    {
        let total = graph.len();
        let ids: Vec<NodeId> = (0..total as NodeId).collect();
        let mut added = 0usize;
        let mut processed = 0usize;

        for batch in ids.chunks(self.batch_size) {
            let neighbours = query_batch(graph, batch, self.strategy);
            for (&id, candidates) in batch.iter().zip(neighbours) {
                for other in candidates {
                    // the radius relation is symmetric, so the pair was seen from `other`
                    if self.strategy.is_symmetric() && other < id {
                        continue;
                    }
                    if graph.connect(id, other)? {
                        added += 1;
                    }
                }
            }

            processed += batch.len();
            debug!(
                processed,
                total,
                percent = percent(processed, total),
                "connected neighbour batch"
            );
            progress(processed, total);
        }
        Ok(added)
    }
}

#[cfg(feature = "parallel")]
fn query_batch(graph: &Graph, batch: &[NodeId], strategy: NeighborStrategy) -> Vec<Vec<NodeId>> {
    use rayon::prelude::*;
    batch
        .par_iter()
        .map(|&id| neighbour_candidates(graph, id, strategy))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn query_batch(graph: &Graph, batch: &[NodeId], strategy: NeighborStrategy) -> Vec<Vec<NodeId>> {
    batch
        .iter()
        .map(|&id| neighbour_candidates(graph, id, strategy))
        .collect()
}

fn neighbour_candidates(graph: &Graph, id: NodeId, strategy: NeighborStrategy) -> Vec<NodeId> {
    let Some(node) = graph.node(id) else {
        return Vec::new();
    };
    let coordinate = node.coordinate();
    let found = match strategy {
        NeighborStrategy::Nearest { k } => graph.nearest_nodes(&coordinate, k.saturating_add(1)),
        NeighborStrategy::LatticeRadius { step_deg } => {
            graph.nodes_within(&coordinate, NeighborStrategy::radius_km(step_deg))
        }
    };
    let mut neighbours: Vec<NodeId> = found
        .into_iter()
        .map(|(other, _)| other)
        .filter(|&other| other != id)
        .collect();
    if let NeighborStrategy::Nearest { k } = strategy {
        neighbours.truncate(k);
    }
    neighbours
}

/// Insert a corridor's samples as a walkable chain and tie every sample to its
/// nearest pre-existing walkable node. Returns the number of new nodes.
fn add_corridor(graph: &mut Graph, corridor: &Corridor) -> Result<usize> {
    let samples = corridor.samples();
    let anchors: Vec<Option<NodeId>> = samples
        .iter()
        .map(|sample| {
            graph
                .nearest_walkable(sample, f64::INFINITY)
                .map(|(id, _)| id)
        })
        .collect();

    let before = graph.len();
    let mut previous: Option<NodeId> = None;
    for (sample, anchor) in samples.iter().zip(anchors) {
        let id = graph.add_node(*sample)?;
        graph.set_walkable(id, true)?;

        if let Some(prev) = previous.filter(|&prev| prev != id) {
            graph.connect(prev, id)?;
        }
        if let Some(anchor) = anchor.filter(|&anchor| anchor != id) {
            graph.connect(id, anchor)?;
        }
        previous = Some(id);
    }

    let added = graph.len() - before;
    debug!(
        corridor = %corridor.name,
        samples = samples.len(),
        added,
        "corridor inserted"
    );
    Ok(added)
}

/// Block the `k` nearest nodes around `count` randomly chosen walkable nodes.
/// Returns the number of distinct nodes blocked.
fn add_hazards(graph: &mut Graph, config: HazardConfig) -> Result<usize> {
    let walkable: Vec<NodeId> = graph
        .nodes()
        .filter(|node| node.walkable)
        .map(|node| node.id())
        .collect();
    if walkable.is_empty() || config.count == 0 || config.k == 0 {
        if config.count > 0 {
            warn!("no walkable nodes available for hazard sampling");
        }
        return Ok(0);
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut blocked = 0usize;
    for _ in 0..config.count {
        let center_id = walkable[rng.random_range(0..walkable.len())];
        let center = graph.require(center_id)?.coordinate();
        let nodes: Vec<NodeId> = graph
            .nearest_nodes(&center, config.k)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        for &id in &nodes {
            if graph.require(id)?.walkable {
                blocked += 1;
            }
            graph.mark_unwalkable(id)?;
        }
        graph.push_hazard(HazardZone { center, nodes });
    }

    info!(
        zones = config.count,
        blocked,
        seed = config.seed,
        "hazard zones injected"
    );
    Ok(blocked)
}

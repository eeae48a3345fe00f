//! Shared fixtures for the integration tests.
//!
//! Graphs are built synthetically over small lattices near the equator; the
//! land fixture is a single square island so classification results are easy
//! to reason about.

use std::fs;
use std::path::PathBuf;

use seaway_lib::{
    BuildConfig, Coordinate, Graph, GraphBuilder, LatticeSpec, NeighborStrategy, OpenWater,
};
use tempfile::TempDir;

/// Island covering latitudes and longitudes 1.5..2.5, so lattice point (2, 2)
/// is the only land point of a 0..5 lattice.
#[allow(dead_code)]
pub const ISLAND_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": { "name": "island" },
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[1.5, 1.5], [2.5, 1.5], [2.5, 2.5], [1.5, 2.5], [1.5, 1.5]]]
      }
    }
  ]
}"#;

pub fn coordinate(lat: f64, lon: f64) -> Coordinate {
    Coordinate::new(lat, lon).expect("valid test coordinate")
}

/// Open-water graph over a `size x size` lattice anchored at the origin,
/// connected with the lattice-radius strategy (eight neighbours).
#[allow(dead_code)]
pub fn lattice_graph(size: usize, step_deg: f64) -> Graph {
    let extent = size as f64 * step_deg;
    let points = LatticeSpec::uniform(0.0, extent, 0.0, extent, step_deg)
        .points()
        .expect("valid lattice");
    GraphBuilder::new(NeighborStrategy::LatticeRadius { step_deg })
        .build(&OpenWater, &points)
        .expect("lattice graph builds")
}

/// Build configuration matching [`ISLAND_GEOJSON`]: a 5x5 lattice at 1 degree.
#[allow(dead_code)]
pub fn island_config() -> BuildConfig {
    BuildConfig {
        lattice: LatticeSpec::uniform(0.0, 5.0, 0.0, 5.0, 1.0),
        neighbors: NeighborStrategy::LatticeRadius { step_deg: 1.0 },
        coast_sample_km: 10.0,
        ..BuildConfig::default()
    }
}

/// Temporary directory holding the island dataset and a cache location.
#[allow(dead_code)]
pub struct DatasetEnv {
    _temp_dir: TempDir,
    pub dataset_path: PathBuf,
    pub cache_path: PathBuf,
}

#[allow(dead_code)]
impl DatasetEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let dataset_path = temp_dir.path().join("land.geojson");
        let cache_path = temp_dir.path().join("cache").join("navigation_graph.bin");
        fs::write(&dataset_path, ISLAND_GEOJSON).expect("write dataset fixture");
        Self {
            _temp_dir: temp_dir,
            dataset_path,
            cache_path,
        }
    }
}

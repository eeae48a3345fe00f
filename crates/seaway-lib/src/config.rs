//! Build configuration and default file locations.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::{Corridor, GraphBuilder, HazardConfig, NeighborStrategy};
use crate::classifier::DEFAULT_COAST_SAMPLE_KM;
use crate::coord::DEFAULT_RESOLUTION_DEG;
use crate::error::{Error, Result};
use crate::lattice::LatticeSpec;

/// Default filename for the cached graph blob.
const CACHE_FILENAME: &str = "navigation_graph.bin";

/// Everything that shapes a built graph. The serialized form is part of the
/// cache key, so changing any field invalidates cached graphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub lattice: LatticeSpec,
    pub neighbors: NeighborStrategy,
    /// Nodes per neighbour-query batch.
    pub batch_size: usize,
    /// Lattice points per land-classification chunk.
    pub classify_chunk_size: usize,
    /// Water points closer than this to the coast are kept but blocked. `0` disables.
    pub build_coastal_buffer_km: f64,
    pub coast_sample_km: f64,
    pub corridors: Vec<Corridor>,
    pub hazards: Option<HazardConfig>,
    pub resolution_deg: f64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            lattice: LatticeSpec::default(),
            neighbors: NeighborStrategy::default(),
            batch_size: 1000,
            classify_chunk_size: 100_000,
            build_coastal_buffer_km: 0.0,
            coast_sample_km: DEFAULT_COAST_SAMPLE_KM,
            corridors: Vec::new(),
            hazards: None,
            resolution_deg: DEFAULT_RESOLUTION_DEG,
        }
    }
}

impl BuildConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| Error::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|err| Error::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        config.validate().map_err(|message| Error::Config {
            path: path.to_path_buf(),
            message,
        })?;
        debug!(path = %path.display(), "loaded build config");
        Ok(config)
    }

    /// Load `path` when given, otherwise fall back to the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if !(self.resolution_deg.is_finite() && self.resolution_deg > 0.0) {
            return Err(format!(
                "resolution_deg must be positive, got {}",
                self.resolution_deg
            ));
        }
        if self.build_coastal_buffer_km < 0.0 {
            return Err("build_coastal_buffer_km cannot be negative".to_string());
        }
        if let NeighborStrategy::Nearest { k: 0 } = self.neighbors {
            return Err("neighbors.k must be at least 1".to_string());
        }
        self.lattice.validate().map_err(|err| err.to_string())
    }

    /// Stable byte encoding mixed into the cache key.
    pub fn fingerprint(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Graph builder configured from these settings.
    pub fn builder(&self) -> GraphBuilder {
        GraphBuilder::new(self.neighbors)
            .batch_size(self.batch_size)
            .coastal_buffer_km(self.build_coastal_buffer_km)
            .resolution_deg(self.resolution_deg)
            .corridors(self.corridors.iter().cloned())
            .hazards(self.hazards)
    }
}

/// Resolve the default cache location using platform-specific project directories.
pub fn default_cache_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("org", "seaway", "seaway").ok_or(Error::ProjectDirsUnavailable)?;
    Ok(dirs.cache_dir().join(CACHE_FILENAME))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"neighbors": {{"kind": "lattice_radius", "step_deg": 0.5}}, "hazards": {{"count": 3, "k": 5, "seed": 42}}}}"#
        )
        .unwrap();

        let config = BuildConfig::load(file.path()).unwrap();
        assert_eq!(
            config.neighbors,
            NeighborStrategy::LatticeRadius { step_deg: 0.5 }
        );
        assert_eq!(config.hazards.unwrap().seed, 42);
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.lattice, LatticeSpec::default());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            BuildConfig::load(file.path()),
            Err(Error::Config { .. })
        ));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"resolution_deg": 0}}"#).unwrap();
        assert!(matches!(
            BuildConfig::load(file.path()),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn fingerprint_tracks_changes() {
        let base = BuildConfig::default();
        let mut changed = base.clone();
        changed.batch_size = 10;
        assert_eq!(base.fingerprint().unwrap(), base.clone().fingerprint().unwrap());
        assert_ne!(base.fingerprint().unwrap(), changed.fingerprint().unwrap());
    }

    #[test]
    fn default_cache_path_has_file_name() {
        if let Ok(path) = default_cache_path() {
            assert_eq!(path.file_name().unwrap(), CACHE_FILENAME);
        }
    }
}

//! Subcommand handlers. `main.rs` parses arguments and dispatches to these.

pub mod build;
pub mod diagnose;
pub mod ports;
pub mod route;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use seaway_lib::{default_cache_path, load_or_build_graph, BuildConfig, Graph};

/// Land dataset, cache location and build configuration for one invocation.
#[derive(Debug, Clone)]
pub struct GraphSource {
    pub dataset: PathBuf,
    pub cache: PathBuf,
    pub config: BuildConfig,
}

impl GraphSource {
    /// Resolve CLI overrides. The cache falls back to the platform cache
    /// directory and the configuration to built-in defaults.
    pub fn resolve(
        dataset: Option<&Path>,
        cache: Option<&Path>,
        config: Option<&Path>,
    ) -> Result<Self> {
        let dataset = dataset
            .map(Path::to_path_buf)
            .context("a land dataset is required (pass --dataset or set SEAWAY_DATASET)")?;
        let cache = match cache {
            Some(path) => path.to_path_buf(),
            None => default_cache_path().context("failed to determine the cache location")?,
        };
        let config = BuildConfig::load_or_default(config)
            .context("failed to load the build configuration")?;
        debug!(
            dataset = %dataset.display(),
            cache = %cache.display(),
            "resolved graph source"
        );
        Ok(Self {
            dataset,
            cache,
            config,
        })
    }

    /// Load the cached graph, building it from the dataset on a miss.
    pub fn load_graph(&self) -> Result<Graph> {
        load_or_build_graph(&self.dataset, &self.cache, &self.config).with_context(|| {
            format!(
                "failed to load navigation graph for {}",
                self.dataset.display()
            )
        })
    }
}

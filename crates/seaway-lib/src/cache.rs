//! Persistent graph cache.
//!
//! A built graph is stored as a single binary blob keyed by the content hash of
//! the land dataset and the build configuration. Any problem reading the blob
//! (missing, truncated, corrupted, stale key, old format) is logged and treated
//! as a cache miss; the graph is rebuilt and the blob rewritten.
//!
//! # Serialization Format
//!
//! ```text
//! Header (16 bytes):
//!   - Magic: b"SWGB" (4 bytes)
//!   - Version: u8 (1 byte)
//!   - Flags: u8 (1 byte) - bit 0: has hazard zones, bit 1: has coast distances
//!   - Node count: u32 LE (4 bytes)
//!   - Edge count: u32 LE (4 bytes)
//!   - Reserved: 2 bytes
//!
//! Source key (32 bytes):
//!   - SHA-256 of dataset bytes + build configuration
//!
//! Body:
//!   - postcard-serialized graph (resolution, nodes, hazard zones)
//!   - zstd compressed
//!
//! Footer (32 bytes):
//!   - SHA-256 checksum of compressed body
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::classifier::LandMask;
use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::graph::{Graph, HazardZone};
use crate::node::Node;

/// Magic bytes identifying a graph cache file.
const CACHE_MAGIC: &[u8; 4] = b"SWGB";

/// Current cache format version.
const CACHE_VERSION: u8 = 1;

const FLAG_HAS_HAZARDS: u8 = 0x01;
const FLAG_HAS_COAST: u8 = 0x02;

const HEADER_SIZE: usize = 16;
const KEY_SIZE: usize = 32;
const CHECKSUM_SIZE: usize = 32;

/// zstd compression level (balanced speed/ratio).
const COMPRESSION_LEVEL: i32 = 3;

/// Identity of the inputs a graph was built from.
pub type SourceKey = [u8; KEY_SIZE];

#[derive(Serialize)]
struct GraphBlobRef<'a> {
    resolution_deg: f64,
    nodes: &'a [Node],
    hazards: &'a [HazardZone],
}

#[derive(Deserialize)]
struct GraphBlob {
    resolution_deg: f64,
    nodes: Vec<Node>,
    hazards: Vec<HazardZone>,
}

/// Hash the dataset contents together with the build configuration.
pub fn source_key(dataset: &[u8], config: &BuildConfig) -> Result<SourceKey> {
    let mut hasher = Sha256::new();
    hasher.update(dataset);
    hasher.update(config.fingerprint()?);
    Ok(hasher.finalize().into())
}

/// A graph blob at a fixed path.
#[derive(Debug, Clone)]
pub struct GraphCache {
    path: PathBuf,
}

impl GraphCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the cached graph when it decodes and matches `key`, otherwise
    /// run `build`, persist its result, and return it.
    pub fn load_or_build_with<F>(&self, key: &SourceKey, build: F) -> Result<Graph>
    where
        F: FnOnce() -> Result<Graph>,
    {
        if self.path.exists() {
            match self.load(key) {
                Ok(graph) => return Ok(graph),
                Err(err) => warn!(
                    path = %self.path.display(),
                    error = %err,
                    "graph cache unusable, rebuilding"
                ),
            }
        } else {
            debug!(path = %self.path.display(), "no graph cache present");
        }

        let graph = build()?;
        self.save(&graph, key)?;
        Ok(graph)
    }

    /// Serialize `graph` under `key`. The file is replaced atomically.
    pub fn save(&self, graph: &Graph, key: &SourceKey) -> Result<()> {
        info!(
            path = %self.path.display(),
            nodes = graph.len(),
            "saving graph cache"
        );

        let blob = GraphBlobRef {
            resolution_deg: graph.resolution(),
            nodes: graph.node_slice(),
            hazards: graph.hazards(),
        };
        let serialized = postcard::to_allocvec(&blob).map_err(|e| Error::CacheSerialize {
            message: format!("postcard serialization failed: {}", e),
        })?;
        let compressed =
            zstd::encode_all(serialized.as_slice(), COMPRESSION_LEVEL).map_err(|e| {
                Error::CacheSerialize {
                    message: format!("zstd compression failed: {}", e),
                }
            })?;
        let checksum = Sha256::digest(&compressed);

        let mut flags = 0u8;
        if !graph.hazards().is_empty() {
            flags |= FLAG_HAS_HAZARDS;
        }
        if graph.nodes().any(|node| node.coast_distance_km.is_some()) {
            flags |= FLAG_HAS_COAST;
        }

        let mut header = [0u8; HEADER_SIZE];
        header[0..4].copy_from_slice(CACHE_MAGIC);
        header[4] = CACHE_VERSION;
        header[5] = flags;
        header[6..10].copy_from_slice(&count_u32(graph.len())?.to_le_bytes());
        header[10..14].copy_from_slice(&count_u32(graph.edge_count())?.to_le_bytes());
        // bytes 14-15 reserved

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut file = NamedTempFile::new_in(&dir)?;
        file.write_all(&header)?;
        file.write_all(key)?;
        file.write_all(&compressed)?;
        file.write_all(&checksum)?;
        file.flush()?;
        file.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        info!(
            file_size = HEADER_SIZE + KEY_SIZE + compressed.len() + CHECKSUM_SIZE,
            compressed_size = compressed.len(),
            "graph cache saved"
        );
        Ok(())
    }

    /// Load the cached graph, failing with [`Error::CacheLoad`] unless the blob
    /// is intact and was built from `key`.
    pub fn load(&self, key: &SourceKey) -> Result<Graph> {
        debug!(path = %self.path.display(), "loading graph cache");
        let bytes = fs::read(&self.path)
            .map_err(|e| self.load_error(format!("failed to read file: {}", e)))?;

        if bytes.len() < HEADER_SIZE + KEY_SIZE + CHECKSUM_SIZE {
            return Err(self.load_error("file is truncated".to_string()));
        }
        let (header, rest) = bytes.split_at(HEADER_SIZE);
        let (stored_key, rest) = rest.split_at(KEY_SIZE);
        let (compressed, stored_checksum) = rest.split_at(rest.len() - CHECKSUM_SIZE);

        if &header[0..4] != CACHE_MAGIC {
            return Err(self.load_error("invalid magic bytes".to_string()));
        }
        let version = header[4];
        if version != CACHE_VERSION {
            return Err(self.load_error(format!(
                "unsupported version {} (expected {})",
                version, CACHE_VERSION
            )));
        }
        if stored_key != key.as_slice() {
            return Err(
                self.load_error("built from a different dataset or configuration".to_string())
            );
        }

        let computed_checksum = Sha256::digest(compressed);
        if computed_checksum.as_slice() != stored_checksum {
            return Err(
                self.load_error("checksum mismatch - file may be corrupted".to_string())
            );
        }

        let decompressed = zstd::decode_all(compressed)
            .map_err(|e| self.load_error(format!("zstd decompression failed: {}", e)))?;
        let blob: GraphBlob = postcard::from_bytes(&decompressed)
            .map_err(|e| self.load_error(format!("postcard deserialization failed: {}", e)))?;

        let node_count = read_u32(&header[6..10]);
        let edge_count = read_u32(&header[10..14]);
        let graph = Graph::from_parts(blob.nodes, blob.hazards, blob.resolution_deg)
            .map_err(|e| self.load_error(e.to_string()))?;
        if graph.len() != node_count as usize || graph.edge_count() != edge_count as usize {
            return Err(self.load_error(format!(
                "header declares {} nodes / {} edges, body has {} / {}",
                node_count,
                edge_count,
                graph.len(),
                graph.edge_count()
            )));
        }

        info!(
            nodes = graph.len(),
            edges = graph.edge_count(),
            hazards = graph.hazards().len(),
            "loaded graph cache"
        );
        Ok(graph)
    }

    fn load_error(&self, message: String) -> Error {
        Error::CacheLoad {
            path: self.path.clone(),
            message,
        }
    }
}

/// Load the graph for `dataset_path` from `cache_path`, building it from the
/// dataset's land geometry when the cache is missing or stale.
pub fn load_or_build_graph(
    dataset_path: &Path,
    cache_path: &Path,
    config: &BuildConfig,
) -> Result<Graph> {
    let dataset = fs::read(dataset_path)?;
    let key = source_key(&dataset, config)?;
    GraphCache::new(cache_path).load_or_build_with(&key, || {
        info!(dataset = %dataset_path.display(), "building navigation graph");
        build_from_dataset(&dataset, config)
    })
}

/// Build a graph from raw GeoJSON land geometry.
pub fn build_from_dataset(dataset: &[u8], config: &BuildConfig) -> Result<Graph> {
    let raw = std::str::from_utf8(dataset).map_err(|e| Error::InvalidGeometry {
        message: format!("dataset is not UTF-8: {}", e),
    })?;
    let mask = LandMask::from_geojson_str(raw, config.coast_sample_km)?;
    let classified = config
        .lattice
        .classify(&mask, config.classify_chunk_size, |_, _| {})?;
    config
        .builder()
        .assume_water(true)
        .build(&mask, &classified.water)
}

fn count_u32(count: usize) -> Result<u32> {
    u32::try_from(count).map_err(|_| Error::CacheSerialize {
        message: format!("count {} exceeds the u32 header field", count),
    })
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::coord::Coordinate;

    fn sample_graph() -> Graph {
        let mut graph = Graph::default();
        let a = graph.add_node(Coordinate { lat: 0.0, lon: 0.0 }).unwrap();
        let b = graph.add_node(Coordinate { lat: 0.0, lon: 1.0 }).unwrap();
        let c = graph.add_node(Coordinate { lat: 1.0, lon: 1.0 }).unwrap();
        graph.connect(a, b).unwrap();
        graph.set_coast_distance(b, Some(12.5)).unwrap();
        graph.mark_unwalkable(c).unwrap();
        graph.push_hazard(HazardZone {
            center: Coordinate { lat: 1.0, lon: 1.0 },
            nodes: vec![c],
        });
        graph.rebuild_index();
        graph
    }

    #[test]
    fn save_then_load_restores_graph() {
        let dir = tempdir().unwrap();
        let cache = GraphCache::new(dir.path().join("nested").join("graph.bin"));
        let key = [7u8; KEY_SIZE];
        let graph = sample_graph();

        cache.save(&graph, &key).unwrap();
        let loaded = cache.load(&key).unwrap();
        assert_eq!(graph, loaded);
        assert_eq!(loaded.hazards().len(), 1);
    }

    #[test]
    fn key_mismatch_is_a_load_error() {
        let dir = tempdir().unwrap();
        let cache = GraphCache::new(dir.path().join("graph.bin"));
        cache.save(&sample_graph(), &[1u8; KEY_SIZE]).unwrap();
        assert!(matches!(
            cache.load(&[2u8; KEY_SIZE]),
            Err(Error::CacheLoad { .. })
        ));
    }

    #[test]
    fn flipped_byte_fails_checksum() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.bin");
        let cache = GraphCache::new(&path);
        let key = [3u8; KEY_SIZE];
        cache.save(&sample_graph(), &key).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let middle = HEADER_SIZE + KEY_SIZE + 1;
        bytes[middle] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        let err = cache.load(&key).unwrap_err();
        assert!(err.to_string().contains("checksum"), "{err}");
    }

    #[test]
    fn source_key_depends_on_config() {
        let base = BuildConfig::default();
        let mut other = base.clone();
        other.build_coastal_buffer_km = 10.0;
        let key = |data: &[u8], config: &BuildConfig| source_key(data, config).unwrap();
        assert_eq!(key(b"data", &base), key(b"data", &base));
        assert_ne!(key(b"data", &base), key(b"data", &other));
        assert_ne!(key(b"data", &base), key(b"date", &base));
    }
}

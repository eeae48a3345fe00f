//! Shared ownership of the active navigation graph.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use crate::cache::load_or_build_graph;
use crate::config::BuildConfig;
use crate::error::Result;
use crate::graph::Graph;
use crate::routing::{route, RoutePlan, RouteRequest};

/// Cheaply cloneable handle to the graph that searches should use.
///
/// Searches take a [`snapshot`](GraphHandle::snapshot) and run against that
/// immutable graph; [`reload`](GraphHandle::reload) swaps in a new graph
/// without disturbing searches already in flight.
///
/// # Example
///
/// ```ignore
/// use seaway_lib::{GraphHandle, RouteRequest};
///
/// let handle = GraphHandle::new(graph);
/// let worker = handle.clone();
/// std::thread::spawn(move || worker.route(&request));
/// handle.reload(rebuilt_graph);
/// ```
#[derive(Clone)]
pub struct GraphHandle {
    inner: Arc<RwLock<Arc<Graph>>>,
}

impl GraphHandle {
    pub fn new(graph: Graph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(graph))),
        }
    }

    /// Load through the cache, building on a miss.
    pub fn load(dataset_path: &Path, cache_path: &Path, config: &BuildConfig) -> Result<Self> {
        load_or_build_graph(dataset_path, cache_path, config).map(Self::new)
    }

    /// The graph current at the time of the call.
    pub fn snapshot(&self) -> Arc<Graph> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Replace the active graph. Returns the previous one.
    pub fn reload(&self, graph: Graph) -> Arc<Graph> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        info!(nodes = graph.len(), edges = graph.edge_count(), "navigation graph reloaded");
        std::mem::replace(&mut *guard, Arc::new(graph))
    }

    /// Plan a route against the current snapshot.
    pub fn route(&self, request: &RouteRequest) -> Result<RoutePlan> {
        route(&self.snapshot(), request)
    }
}

impl std::fmt::Debug for GraphHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let graph = self.snapshot();
        f.debug_struct("GraphHandle")
            .field("nodes", &graph.len())
            .field("edges", &graph.edge_count())
            .finish()
    }
}

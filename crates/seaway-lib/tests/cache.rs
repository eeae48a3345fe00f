mod common;

use std::cell::Cell;
use std::fs;

use common::{coordinate, island_config, lattice_graph, DatasetEnv, ISLAND_GEOJSON};
use seaway_lib::{
    load_or_build_graph, route, source_key, BuildConfig, GraphCache, NeighborStrategy,
    RouteRequest,
};

#[test]
fn builder_runs_only_on_a_miss() {
    let env = DatasetEnv::new();
    let cache = GraphCache::new(&env.cache_path);
    let key = source_key(ISLAND_GEOJSON.as_bytes(), &island_config()).expect("key");
    let builds = Cell::new(0);

    let first = cache
        .load_or_build_with(&key, || {
            builds.set(builds.get() + 1);
            Ok(lattice_graph(3, 1.0))
        })
        .expect("first load builds");
    assert_eq!(builds.get(), 1);
    assert!(env.cache_path.exists());

    let second = cache
        .load_or_build_with(&key, || {
            builds.set(builds.get() + 1);
            Ok(lattice_graph(3, 1.0))
        })
        .expect("second load hits the cache");
    assert_eq!(builds.get(), 1);
    assert_eq!(first, second);
}

#[test]
fn corrupt_or_stale_cache_is_rebuilt() {
    let env = DatasetEnv::new();
    let cache = GraphCache::new(&env.cache_path);
    let config = island_config();
    let key = source_key(ISLAND_GEOJSON.as_bytes(), &config).expect("key");
    cache.save(&lattice_graph(3, 1.0), &key).expect("save");

    fs::write(&env.cache_path, b"SWGB not really a graph").expect("corrupt cache");
    let builds = Cell::new(0);
    let rebuilt = cache
        .load_or_build_with(&key, || {
            builds.set(builds.get() + 1);
            Ok(lattice_graph(4, 1.0))
        })
        .expect("rebuild after corruption");
    assert_eq!(builds.get(), 1);
    assert_eq!(rebuilt.len(), 16);

    let other_config = BuildConfig {
        neighbors: NeighborStrategy::Nearest { k: 8 },
        ..config
    };
    let other_key = source_key(ISLAND_GEOJSON.as_bytes(), &other_config).expect("key");
    assert_ne!(key, other_key);
    assert!(cache.load(&other_key).is_err());
    cache
        .load_or_build_with(&other_key, || {
            builds.set(builds.get() + 1);
            Ok(lattice_graph(2, 1.0))
        })
        .expect("rebuild for new key");
    assert_eq!(builds.get(), 2);
}

#[test]
fn dataset_change_invalidates_key() {
    let config = island_config();
    let original = source_key(ISLAND_GEOJSON.as_bytes(), &config).expect("key");
    let edited = ISLAND_GEOJSON.replace("2.5, 2.5", "2.6, 2.5");
    assert_ne!(original, source_key(edited.as_bytes(), &config).expect("key"));
}

#[test]
fn dataset_graph_round_trips_through_cache() {
    let env = DatasetEnv::new();
    let config = island_config();

    let built = load_or_build_graph(&env.dataset_path, &env.cache_path, &config)
        .expect("build from dataset");
    // 5x5 lattice minus the single island point
    assert_eq!(built.len(), 24);
    assert!(built.node_id(&coordinate(2.0, 2.0)).is_none());
    assert!(built
        .nodes()
        .all(|node| node.coast_distance_km.is_some()));

    let cached = load_or_build_graph(&env.dataset_path, &env.cache_path, &config)
        .expect("load from cache");
    assert_eq!(built, cached);

    let plan = route(
        &cached,
        &RouteRequest::new(coordinate(2.0, 1.0), coordinate(2.0, 3.0)),
    )
    .expect("route around the island");
    assert!(plan.hop_count() >= 2);
    assert!(!plan.path.coordinates.contains(&coordinate(2.0, 2.0)));
}

use criterion::{criterion_group, criterion_main, Criterion};
use once_cell::sync::Lazy;
use seaway_lib::{
    route, Coordinate, Graph, GraphBuilder, LatticeSpec, NeighborStrategy, OpenWater,
    RouteAlgorithm, RouteRequest,
};
use std::hint::black_box;

const STEP_DEG: f64 = 0.25;

static GRAPH: Lazy<Graph> = Lazy::new(|| {
    let points = LatticeSpec::uniform(-10.0, 10.0, -10.0, 10.0, STEP_DEG)
        .points()
        .expect("valid lattice");
    GraphBuilder::new(NeighborStrategy::LatticeRadius { step_deg: STEP_DEG })
        .build(&OpenWater, &points)
        .expect("lattice graph builds")
});
static A_STAR_REQUEST: Lazy<RouteRequest> = Lazy::new(|| {
    RouteRequest::new(
        Coordinate { lat: -9.5, lon: -9.5 },
        Coordinate { lat: 9.5, lon: 8.0 },
    )
});
static DIJKSTRA_REQUEST: Lazy<RouteRequest> =
    Lazy::new(|| A_STAR_REQUEST.clone().with_algorithm(RouteAlgorithm::Dijkstra));
static SNAPPED_REQUEST: Lazy<RouteRequest> = Lazy::new(|| {
    RouteRequest::new(
        Coordinate { lat: -9.43, lon: -9.61 },
        Coordinate { lat: 9.38, lon: 8.07 },
    )
});

fn benchmark_pathfinding(c: &mut Criterion) {
    let graph = &*GRAPH;

    c.bench_function("a_star_lattice_diagonal", |b| {
        let request = &*A_STAR_REQUEST;
        b.iter(|| {
            let plan = route(graph, request).expect("route exists");
            black_box(plan.hop_count())
        });
    });

    c.bench_function("dijkstra_lattice_diagonal", |b| {
        let request = &*DIJKSTRA_REQUEST;
        b.iter(|| {
            let plan = route(graph, request).expect("route exists");
            black_box(plan.length_km())
        });
    });

    c.bench_function("a_star_snapped_endpoints", |b| {
        let request = &*SNAPPED_REQUEST;
        b.iter(|| {
            let plan = route(graph, request).expect("route exists");
            black_box(plan.expanded)
        });
    });
}

criterion_group!(benches, benchmark_pathfinding);
criterion_main!(benches);

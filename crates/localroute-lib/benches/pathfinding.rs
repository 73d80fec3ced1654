use criterion::{criterion_group, criterion_main, Criterion};
use localroute_lib::{
    Coordinate, GazetteerStore, GeocodingResolver, NetworkData, NetworkEdge, NetworkNode,
    PlannerConfig, RoadNetworkGraph, RouteAlgorithm, RoutePlanner, ScoringConfig,
};
use once_cell::sync::Lazy;
use std::hint::black_box;
use std::path::PathBuf;

const GRID: i64 = 60;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/fixtures/gazetteer.csv")
}

fn point(row: i64, column: i64) -> (f64, f64) {
    (40.0 + row as f64 * 0.002, -75.0 + column as f64 * 0.0026)
}

static NETWORK: Lazy<RoadNetworkGraph> = Lazy::new(|| {
    let mut data = NetworkData::default();
    let id = |row: i64, column: i64| row * GRID + column;
    for row in 0..GRID {
        for column in 0..GRID {
            let (lat, lon) = point(row, column);
            data.nodes.push(NetworkNode::new(id(row, column), lat, lon));
        }
    }
    let mut edge_id = 0;
    for row in 0..GRID {
        for column in 0..GRID {
            // Vary lengths so the search has real work to do.
            let jitter = ((row * 7 + column * 13) % 11) as f64;
            if column + 1 < GRID {
                data.edges.push(NetworkEdge::new(
                    edge_id,
                    id(row, column),
                    id(row, column + 1),
                    230.0 + jitter,
                ));
                edge_id += 1;
            }
            if row + 1 < GRID {
                data.edges.push(NetworkEdge::new(
                    edge_id,
                    id(row, column),
                    id(row + 1, column),
                    225.0 + jitter,
                ));
                edge_id += 1;
            }
        }
    }
    RoadNetworkGraph::build(data).expect("grid builds")
});

static GAZETTEER: Lazy<GazetteerStore> =
    Lazy::new(|| GazetteerStore::load(&fixture_path()).expect("fixture loads"));

fn waypoints() -> [Coordinate; 2] {
    let (a_lat, a_lon) = point(0, 0);
    let (b_lat, b_lon) = point(GRID - 1, GRID - 1);
    [
        Coordinate::new(a_lat, a_lon).expect("valid"),
        Coordinate::new(b_lat, b_lon).expect("valid"),
    ]
}

fn benchmark_pathfinding(c: &mut Criterion) {
    let network = &*NETWORK;
    let waypoints = waypoints();

    for algorithm in [RouteAlgorithm::Dijkstra, RouteAlgorithm::AStar] {
        let planner = RoutePlanner::new(
            network,
            PlannerConfig {
                algorithm,
                ..PlannerConfig::default()
            },
        );
        c.bench_function(&format!("{algorithm}_grid_corner_to_corner"), |b| {
            b.iter(|| {
                let route = planner.plan(&waypoints).expect("route exists");
                black_box(route.total_distance_meters)
            });
        });
    }

    c.bench_function("nearest_node_lookup", |b| {
        let target = Coordinate::new(40.05, -75.07).expect("valid");
        b.iter(|| black_box(network.nearest_node(&target).expect("node").id));
    });

    c.bench_function("geocode_fixture_typo", |b| {
        let resolver = GeocodingResolver::new(&GAZETTEER, ScoringConfig::default());
        b.iter(|| black_box(resolver.resolve("456 Oak Avnue", 5).expect("valid query").len()));
    });
}

criterion_group!(benches, benchmark_pathfinding);
criterion_main!(benches);

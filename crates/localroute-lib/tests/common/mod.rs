#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use localroute_lib::{
    Coordinate, GazetteerStore, NetworkData, NetworkEdge, NetworkNode, RoadNetworkGraph,
    RouteService, ServiceConfig,
};

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/fixtures")
}

pub fn gazetteer_fixture() -> PathBuf {
    fixtures_dir().join("gazetteer.csv")
}

pub fn network_fixture() -> PathBuf {
    fixtures_dir().join("network.db")
}

pub fn fixture_service() -> RouteService {
    let gazetteer = GazetteerStore::load(&gazetteer_fixture()).expect("gazetteer fixture loads");
    let network = RoadNetworkGraph::load(&network_fixture()).expect("network fixture loads");
    RouteService::new(
        Arc::new(gazetteer),
        Arc::new(network),
        ServiceConfig::default(),
    )
}

pub fn at(latitude: f64, longitude: f64) -> Coordinate {
    Coordinate::new(latitude, longitude).expect("valid coordinate")
}

/// A 5 x 5 grid of unit-cost streets roughly 850 m apart. Node ids are
/// `row * 10 + column + 1`.
pub fn grid() -> RoadNetworkGraph {
    let mut data = NetworkData::default();
    let id = |row: i64, column: i64| row * 10 + column + 1;
    for row in 0..5 {
        for column in 0..5 {
            data.nodes.push(NetworkNode::new(
                id(row, column),
                40.0 + row as f64 * 0.0077,
                -75.0 + column as f64 * 0.01,
            ));
        }
    }
    let mut edge_id = 1;
    for row in 0..5 {
        for column in 0..5 {
            if column < 4 {
                data.edges.push(NetworkEdge::new(
                    edge_id,
                    id(row, column),
                    id(row, column + 1),
                    850.0,
                ));
                edge_id += 1;
            }
            if row < 4 {
                data.edges.push(NetworkEdge::new(
                    edge_id,
                    id(row, column),
                    id(row + 1, column),
                    855.0,
                ));
                edge_id += 1;
            }
        }
    }
    RoadNetworkGraph::build(data).expect("grid is valid")
}

/// Grid node coordinate.
pub fn grid_point(row: i64, column: i64) -> Coordinate {
    at(40.0 + row as f64 * 0.0077, -75.0 + column as f64 * 0.01)
}

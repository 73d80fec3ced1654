// Fixture builders shared by unit tests and dependent crates' tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::{params, Connection};

use crate::error::{Error, Result};
use crate::gazetteer::{GazetteerStore, PlaceInput, PlaceKind};
use crate::network::{NetworkData, NetworkEdge, NetworkNode, RoadClass, RoadNetworkGraph};
use crate::service::{RouteService, ServiceConfig};

/// Places of the sample town. "123 Main St" and "456 Oak Ave" sit on the
/// two ends of the sample network's 1500 m main corridor.
pub fn sample_places() -> Vec<PlaceInput> {
    vec![
        PlaceInput::address("p-main-123", "123 Main St", 40.0, -75.0).with_region("Springfield"),
        PlaceInput::address("p-oak-456", "456 Oak Ave", 40.01, -75.02).with_region("Springfield"),
        PlaceInput::address("p-pine-789", "789 Pine Rd", 40.005, -75.01).with_region("Springfield"),
        PlaceInput::address("p-main-12", "12 Main St", 40.0004, -75.0003)
            .with_region("Springfield"),
        PlaceInput::address("p-station", "Central Station", 40.02, -75.0)
            .with_region("Springfield")
            .with_kind(PlaceKind::Poi),
        PlaceInput::address("p-springfield", "Springfield", 40.005, -75.01)
            .with_kind(PlaceKind::Locality),
    ]
}

pub fn sample_gazetteer() -> GazetteerStore {
    GazetteerStore::from_records(sample_places()).expect("sample gazetteer is valid")
}

/// Corridor 1 -> 2 -> 3 -> 4 of three 500 m edges, a 200 m spur to node 6
/// and a 2 km dead end to node 5.
pub fn sample_network_data() -> NetworkData {
    NetworkData {
        nodes: vec![
            NetworkNode::new(1, 40.0, -75.0),
            NetworkNode::new(2, 40.0, -75.0067),
            NetworkNode::new(3, 40.005, -75.0133),
            NetworkNode::new(4, 40.01, -75.02),
            NetworkNode::new(5, 40.02, -75.0),
            NetworkNode::new(6, 40.005, -75.01),
        ],
        edges: vec![
            NetworkEdge::new(1, 1, 2, 500.0)
                .with_name("Main St")
                .with_road_class(RoadClass::Secondary),
            NetworkEdge::new(2, 2, 3, 500.0)
                .with_name("Market St")
                .with_road_class(RoadClass::Tertiary),
            NetworkEdge::new(3, 3, 4, 500.0)
                .with_name("Oak Ave")
                .with_road_class(RoadClass::Residential),
            NetworkEdge::new(4, 1, 5, 2000.0).with_name("Station Rd"),
            NetworkEdge::new(5, 3, 6, 200.0)
                .with_name("Pine Rd")
                .with_road_class(RoadClass::Residential),
        ],
    }
}

pub fn sample_network() -> RoadNetworkGraph {
    RoadNetworkGraph::build(sample_network_data()).expect("sample network is valid")
}

pub fn sample_service() -> RouteService {
    RouteService::new(
        Arc::new(sample_gazetteer()),
        Arc::new(sample_network()),
        ServiceConfig::default(),
    )
}

/// Builder for small ad-hoc networks in tests.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    data: NetworkData,
}

impl NetworkBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, id: i64, latitude: f64, longitude: f64) -> Self {
        self.data.nodes.push(NetworkNode::new(id, latitude, longitude));
        self
    }

    pub fn road(mut self, id: i64, from: i64, to: i64, length_meters: f64) -> Self {
        self.data
            .edges
            .push(NetworkEdge::new(id, from, to, length_meters));
        self
    }

    pub fn edge(mut self, edge: NetworkEdge) -> Self {
        self.data.edges.push(edge);
        self
    }

    pub fn data(self) -> NetworkData {
        self.data
    }

    pub fn build(self) -> RoadNetworkGraph {
        RoadNetworkGraph::build(self.data).expect("test network is valid")
    }
}

/// Write places as a gazetteer CSV with the full column set.
pub fn write_gazetteer_csv(path: &Path, places: &[PlaceInput]) -> Result<()> {
    let csv_error = |e: csv::Error| Error::data_load(path.display().to_string(), e.to_string());
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer
        .write_record(["id", "name", "latitude", "longitude", "region", "kind"])
        .map_err(csv_error)?;
    for place in places {
        writer.write_record([
            place.id.clone(),
            place.name.clone(),
            place.latitude.to_string(),
            place.longitude.to_string(),
            place.region.clone().unwrap_or_default(),
            place.kind.to_string(),
        ])
        .map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a road network database with every optional edge column.
pub fn write_network_db(path: &Path, data: &NetworkData) -> Result<()> {
    let mut connection = Connection::open(path)?;
    connection.execute_batch(
        "CREATE TABLE nodes (
             node_id INTEGER PRIMARY KEY,
             latitude REAL NOT NULL,
             longitude REAL NOT NULL
         );
         CREATE TABLE edges (
             edge_id INTEGER PRIMARY KEY,
             from_node INTEGER NOT NULL,
             to_node INTEGER NOT NULL,
             length_m REAL NOT NULL,
             cost REAL,
             bidirectional INTEGER,
             name TEXT,
             road_class TEXT,
             max_speed_kmh REAL
         );",
    )?;

    let tx = connection.transaction()?;
    for node in &data.nodes {
        tx.execute(
            "INSERT INTO nodes (node_id, latitude, longitude) VALUES (?1, ?2, ?3)",
            params![node.id, node.coordinate.latitude, node.coordinate.longitude],
        )?;
    }
    for edge in &data.edges {
        tx.execute(
            "INSERT INTO edges (edge_id, from_node, to_node, length_m, cost, bidirectional,
                                name, road_class, max_speed_kmh)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                edge.id,
                edge.from,
                edge.to,
                edge.length_meters,
                edge.traversal_cost,
                edge.is_bidirectional,
                edge.name,
                edge.road_class.to_string(),
                edge.max_speed_kmh,
            ],
        )?;
    }
    tx.commit()?;
    Ok(())
}

/// Sample gazetteer and network written to a temporary directory.
pub struct SampleFiles {
    pub dir: tempfile::TempDir,
    pub gazetteer: PathBuf,
    pub network: PathBuf,
}

pub fn write_sample_files() -> Result<SampleFiles> {
    let dir = tempfile::tempdir()?;
    let gazetteer = dir.path().join("gazetteer.csv");
    let network = dir.path().join("network.db");
    write_gazetteer_csv(&gazetteer, &sample_places())?;
    write_network_db(&network, &sample_network_data())?;
    Ok(SampleFiles {
        dir,
        gazetteer,
        network,
    })
}

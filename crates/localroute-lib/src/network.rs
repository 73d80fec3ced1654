use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rusqlite::{Connection, OpenFlags, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::geo::Coordinate;
use crate::spatial::{try_load_spatial_index, SpatialIndex};

/// Numeric identifier for a road network node.
pub type NodeId = i64;

/// Numeric identifier for a road network edge.
pub type EdgeId = i64;

/// A junction or shape point of the road network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: NodeId,
    pub coordinate: Coordinate,
}

impl NetworkNode {
    pub fn new(id: NodeId, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            coordinate: Coordinate {
                latitude,
                longitude,
            },
        }
    }
}

/// Functional class of a road, used to pick a default travel speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadClass {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Residential,
    Service,
    #[default]
    Unclassified,
}

impl fmt::Display for RoadClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            RoadClass::Motorway => "motorway",
            RoadClass::Trunk => "trunk",
            RoadClass::Primary => "primary",
            RoadClass::Secondary => "secondary",
            RoadClass::Tertiary => "tertiary",
            RoadClass::Residential => "residential",
            RoadClass::Service => "service",
            RoadClass::Unclassified => "unclassified",
        };
        f.write_str(value)
    }
}

impl FromStr for RoadClass {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "motorway" => Ok(RoadClass::Motorway),
            "trunk" => Ok(RoadClass::Trunk),
            "primary" => Ok(RoadClass::Primary),
            "secondary" => Ok(RoadClass::Secondary),
            "tertiary" => Ok(RoadClass::Tertiary),
            "residential" => Ok(RoadClass::Residential),
            "service" => Ok(RoadClass::Service),
            "" | "unclassified" => Ok(RoadClass::Unclassified),
            other => Err(format!("unknown road class '{other}'")),
        }
    }
}

/// A road segment between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub length_meters: f64,
    pub traversal_cost: f64,
    pub is_bidirectional: bool,
    pub name: Option<String>,
    pub road_class: RoadClass,
    pub max_speed_kmh: Option<f64>,
}

impl NetworkEdge {
    /// A two-way, unnamed edge whose cost equals its length.
    pub fn new(id: EdgeId, from: NodeId, to: NodeId, length_meters: f64) -> Self {
        Self {
            id,
            from,
            to,
            length_meters,
            traversal_cost: length_meters,
            is_bidirectional: true,
            name: None,
            road_class: RoadClass::Unclassified,
            max_speed_kmh: None,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.traversal_cost = cost;
        self
    }

    pub fn one_way(mut self) -> Self {
        self.is_bidirectional = false;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_road_class(mut self, road_class: RoadClass) -> Self {
        self.road_class = road_class;
        self
    }

    pub fn with_max_speed(mut self, kmh: f64) -> Self {
        self.max_speed_kmh = Some(kmh);
        self
    }
}

/// Raw nodes and edges handed to [`RoadNetworkGraph::build`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkData {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
}

/// Directed traversal of an edge, stored in the adjacency lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Link {
    /// Index into the edge table.
    pub(crate) edge: usize,
    /// Index of the node reached by following the link.
    pub(crate) target: usize,
}

/// Read-only road network with adjacency lists and a nearest-node index.
///
/// Node and edge tables are kept sorted by id and adjacency lists are sorted
/// by edge id, so iteration order never depends on input order.
#[derive(Debug)]
pub struct RoadNetworkGraph {
    nodes: Vec<NetworkNode>,
    node_index: HashMap<NodeId, usize>,
    edges: Vec<NetworkEdge>,
    edge_index: HashMap<EdgeId, usize>,
    adjacency: Vec<Vec<Link>>,
    spatial: SpatialIndex,
    cost_per_meter_floor: f64,
}

impl RoadNetworkGraph {
    /// Validate network data and build adjacency and the spatial index.
    pub fn build(data: NetworkData) -> Result<Self> {
        Self::build_with_index(data, None)
    }

    /// Like [`build`](Self::build), reusing a prebuilt spatial index when it
    /// covers exactly the same nodes.
    pub fn build_with_index(data: NetworkData, index: Option<SpatialIndex>) -> Result<Self> {
        Self::assemble("in-memory network", data, index)
    }

    /// Load a network from an SQLite database.
    ///
    /// Required tables are `nodes(node_id, latitude, longitude)` and
    /// `edges(edge_id, from_node, to_node, length_m)`. The optional edge
    /// columns `cost`, `bidirectional`, `name`, `road_class` and
    /// `max_speed_kmh` are detected at runtime. A spatial index stored beside
    /// the database is reused when it is valid.
    pub fn load(path: &Path) -> Result<Self> {
        let source_name = path.display().to_string();
        let data = read_network(path).map_err(|e| match e {
            Error::Sqlite(err) => Error::data_load(&source_name, err.to_string()),
            other => other,
        })?;
        let index = try_load_spatial_index(path);
        Self::assemble(&source_name, data, index)
    }

    fn assemble(source_name: &str, data: NetworkData, index: Option<SpatialIndex>) -> Result<Self> {
        let NetworkData {
            mut nodes,
            mut edges,
        } = data;

        nodes.sort_by_key(|node| node.id);
        let mut node_index = HashMap::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            if !node.coordinate.is_valid() {
                return Err(Error::data_load(
                    source_name,
                    format!("node {} has invalid coordinate {}", node.id, node.coordinate),
                ));
            }
            if node_index.insert(node.id, index).is_some() {
                return Err(Error::data_load(
                    source_name,
                    format!("duplicate node id {}", node.id),
                ));
            }
        }

        edges.sort_by_key(|edge| edge.id);
        let mut edge_index = HashMap::with_capacity(edges.len());
        let mut adjacency: Vec<Vec<Link>> = vec![Vec::new(); nodes.len()];
        for (index, edge) in edges.iter().enumerate() {
            validate_edge(edge).map_err(|message| Error::data_load(source_name, message))?;
            if edge_index.insert(edge.id, index).is_some() {
                return Err(Error::data_load(
                    source_name,
                    format!("duplicate edge id {}", edge.id),
                ));
            }
            let endpoint = |id: NodeId| {
                node_index.get(&id).copied().ok_or_else(|| {
                    Error::data_load(
                        source_name,
                        format!("edge {} references unknown node {id}", edge.id),
                    )
                })
            };
            let from = endpoint(edge.from)?;
            let to = endpoint(edge.to)?;

            adjacency[from].push(Link {
                edge: index,
                target: to,
            });
            if edge.is_bidirectional && from != to {
                adjacency[to].push(Link {
                    edge: index,
                    target: from,
                });
            }
        }
        // Edge indices follow edge id order, so this sorts by edge id.
        for links in &mut adjacency {
            links.sort_by_key(|link| (link.edge, link.target));
        }

        let spatial = match index {
            Some(index) if index.covers(&nodes) => index,
            Some(_) => {
                warn!(
                    source = source_name,
                    "spatial index does not match network nodes, rebuilding"
                );
                SpatialIndex::build(&nodes)
            }
            None => SpatialIndex::build(&nodes),
        };

        let cost_per_meter_floor = cost_per_meter_floor(&nodes, &node_index, &edges);

        info!(
            source = source_name,
            nodes = nodes.len(),
            edges = edges.len(),
            one_way = edges.iter().filter(|e| !e.is_bidirectional).count(),
            "road network built"
        );

        Ok(Self {
            nodes,
            node_index,
            edges,
            edge_index,
            adjacency,
            spatial,
            cost_per_meter_floor,
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns true when the network has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes, ordered by id.
    pub fn nodes(&self) -> &[NetworkNode] {
        &self.nodes
    }

    /// All edges, ordered by id.
    pub fn edges(&self) -> &[NetworkEdge] {
        &self.edges
    }

    pub fn node(&self, id: NodeId) -> Option<&NetworkNode> {
        self.node_index.get(&id).map(|&index| &self.nodes[index])
    }

    pub fn edge(&self, id: EdgeId) -> Option<&NetworkEdge> {
        self.edge_index.get(&id).map(|&index| &self.edges[index])
    }

    /// Edges leaving `id` in traversal direction, ordered by edge id.
    pub fn neighbours(&self, id: NodeId) -> impl Iterator<Item = (&NetworkEdge, NodeId)> + '_ {
        self.node_index
            .get(&id)
            .map(|&index| self.adjacency[index].as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|link| (&self.edges[link.edge], self.nodes[link.target].id))
    }

    /// Nearest node to a coordinate. Ties go to the lowest node id.
    pub fn nearest_node(&self, coordinate: &Coordinate) -> Result<&NetworkNode> {
        self.nearest_node_with_distance(coordinate)
            .map(|(node, _)| node)
    }

    /// Nearest node and its great-circle distance in metres.
    pub fn nearest_node_with_distance(
        &self,
        coordinate: &Coordinate,
    ) -> Result<(&NetworkNode, f64)> {
        let no_point = || Error::NoReachablePoint {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
        };
        let (id, distance) = self.spatial.nearest(coordinate).ok_or_else(no_point)?;
        let node = self.node(id).ok_or_else(no_point)?;
        Ok((node, distance))
    }

    pub fn spatial_index(&self) -> &SpatialIndex {
        &self.spatial
    }

    /// Lower bound on traversal cost per metre of straight-line distance
    /// over every edge. Scales the A* heuristic.
    pub fn cost_per_meter_floor(&self) -> f64 {
        self.cost_per_meter_floor
    }

    pub(crate) fn index_of(&self, id: NodeId) -> Option<usize> {
        self.node_index.get(&id).copied()
    }

    pub(crate) fn node_at(&self, index: usize) -> &NetworkNode {
        &self.nodes[index]
    }

    pub(crate) fn edge_at(&self, index: usize) -> &NetworkEdge {
        &self.edges[index]
    }

    pub(crate) fn links(&self, index: usize) -> &[Link] {
        &self.adjacency[index]
    }
}

fn validate_edge(edge: &NetworkEdge) -> std::result::Result<(), String> {
    if !edge.length_meters.is_finite() || edge.length_meters < 0.0 {
        return Err(format!(
            "edge {} has invalid length {}",
            edge.id, edge.length_meters
        ));
    }
    if !edge.traversal_cost.is_finite() || edge.traversal_cost < 0.0 {
        return Err(format!(
            "edge {} has invalid cost {}",
            edge.id, edge.traversal_cost
        ));
    }
    if let Some(speed) = edge.max_speed_kmh {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(format!("edge {} has invalid max speed {speed}", edge.id));
        }
    }
    Ok(())
}

fn cost_per_meter_floor(
    nodes: &[NetworkNode],
    node_index: &HashMap<NodeId, usize>,
    edges: &[NetworkEdge],
) -> f64 {
    let mut floor = f64::INFINITY;
    for edge in edges {
        let (Some(&from), Some(&to)) = (node_index.get(&edge.from), node_index.get(&edge.to)) else {
            continue;
        };
        let straight = nodes[from].coordinate.distance_to(&nodes[to].coordinate);
        if straight <= 0.0 {
            continue;
        }
        floor = floor.min(edge.traversal_cost / straight);
        if floor == 0.0 {
            break;
        }
    }
    if floor.is_finite() {
        floor
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct OptionalEdgeColumns {
    cost: bool,
    bidirectional: bool,
    name: bool,
    road_class: bool,
    max_speed: bool,
}

fn read_network(path: &Path) -> Result<NetworkData> {
    let source_name = path.display().to_string();
    if !path.exists() {
        return Err(Error::data_load(&source_name, "file not found"));
    }

    let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    debug!(path = %source_name, "loading road network");

    for (table, columns) in [
        ("nodes", &["node_id", "latitude", "longitude"][..]),
        ("edges", &["edge_id", "from_node", "to_node", "length_m"][..]),
    ] {
        if !table_exists(&connection, table)? {
            return Err(Error::data_load(
                &source_name,
                format!("missing required table '{table}'"),
            ));
        }
        if !table_has_columns(&connection, table, columns)? {
            return Err(Error::data_load(
                &source_name,
                format!(
                    "table '{table}' must provide columns {}",
                    columns.join(", ")
                ),
            ));
        }
    }

    let optional = OptionalEdgeColumns {
        cost: table_has_columns(&connection, "edges", &["cost"])?,
        bidirectional: table_has_columns(&connection, "edges", &["bidirectional"])?,
        name: table_has_columns(&connection, "edges", &["name"])?,
        road_class: table_has_columns(&connection, "edges", &["road_class"])?,
        max_speed: table_has_columns(&connection, "edges", &["max_speed_kmh"])?,
    };
    debug!(?optional, "detected optional edge columns");

    let nodes = load_nodes(&connection)?;
    let edges = load_edges(&connection, optional, &source_name)?;
    Ok(NetworkData { nodes, edges })
}

fn load_nodes(connection: &Connection) -> Result<Vec<NetworkNode>> {
    let mut stmt = connection.prepare("SELECT node_id, latitude, longitude FROM nodes")?;
    let rows = stmt.query_map([], |row| {
        Ok(NetworkNode::new(row.get(0)?, row.get(1)?, row.get(2)?))
    })?;

    let mut nodes = Vec::new();
    for node in rows {
        nodes.push(node?);
    }
    Ok(nodes)
}

fn load_edges(
    connection: &Connection,
    optional: OptionalEdgeColumns,
    source_name: &str,
) -> Result<Vec<NetworkEdge>> {
    let column = |present: bool, name: &str| {
        if present {
            name.to_string()
        } else {
            format!("NULL AS {name}")
        }
    };
    let sql = format!(
        "SELECT edge_id, from_node, to_node, length_m, \
         {cost}, {bidirectional}, {name}, {road_class}, {max_speed} FROM edges",
        cost = column(optional.cost, "cost"),
        bidirectional = column(optional.bidirectional, "bidirectional"),
        name = column(optional.name, "name"),
        road_class = column(optional.road_class, "road_class"),
        max_speed = column(optional.max_speed, "max_speed_kmh"),
    );

    let mut stmt = connection.prepare(&sql)?;
    let rows = stmt.query_map([], row_to_edge)?;

    let mut edges = Vec::new();
    let mut unknown_classes = 0usize;
    for row in rows {
        let (mut edge, road_class) = row?;
        if let Some(value) = road_class {
            match value.parse() {
                Ok(class) => edge.road_class = class,
                Err(_) => unknown_classes += 1,
            }
        }
        edges.push(edge);
    }

    if unknown_classes > 0 {
        warn!(
            source = source_name,
            unknown_classes, "unrecognised road classes treated as unclassified"
        );
    }

    Ok(edges)
}

fn row_to_edge(row: &Row<'_>) -> rusqlite::Result<(NetworkEdge, Option<String>)> {
    let length_meters: f64 = row.get(3)?;
    let edge = NetworkEdge {
        id: row.get(0)?,
        from: row.get(1)?,
        to: row.get(2)?,
        length_meters,
        traversal_cost: row.get::<_, Option<f64>>(4)?.unwrap_or(length_meters),
        is_bidirectional: row.get::<_, Option<bool>>(5)?.unwrap_or(true),
        name: row.get::<_, Option<String>>(6)?.filter(|n| !n.trim().is_empty()),
        road_class: RoadClass::Unclassified,
        max_speed_kmh: row.get(8)?,
    };
    Ok((edge, row.get(7)?))
}

fn table_exists(connection: &Connection, table: &str) -> Result<bool> {
    let mut stmt = connection
        .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 LIMIT 1")?;
    let mut rows = stmt.query([table])?;
    Ok(rows.next()?.is_some())
}

fn table_has_columns(connection: &Connection, table: &str, required: &[&str]) -> Result<bool> {
    let pragma = format!("PRAGMA table_info('{table}')");
    let mut stmt = connection.prepare(&pragma)?;
    let mut rows = stmt.query([])?;

    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        columns.push(name);
    }

    Ok(required.iter().all(|required| {
        columns
            .iter()
            .any(|column| column.eq_ignore_ascii_case(required))
    }))
}

mod common;

use std::fs;

use localroute_lib::{Error, GazetteerStore, RoadNetworkGraph};
use rusqlite::Connection;
use tempfile::tempdir;

#[test]
fn missing_gazetteer_is_a_data_load_error() {
    let dir = tempdir().expect("temp dir");
    let err = GazetteerStore::load(&dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, Error::DataLoad { .. }), "{err:?}");
}

#[test]
fn malformed_gazetteer_rows_report_the_line() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("bad.csv");
    fs::write(
        &path,
        "id,name,latitude,longitude\np1,123 Main St,40.0,-75.0\np2,456 Oak Ave,north,-75.02\n",
    )
    .expect("write csv");
    let err = GazetteerStore::load(&path).unwrap_err();
    match err {
        Error::DataLoad { message, .. } => assert!(message.contains("row 3"), "{message}"),
        other => panic!("expected DataLoad, got {other:?}"),
    }
}

#[test]
fn gazetteer_rejects_out_of_range_and_duplicate_records() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("range.csv");
    fs::write(&path, "id,name,latitude,longitude\np1,Somewhere,120.0,0.0\n").expect("write csv");
    assert!(matches!(
        GazetteerStore::load(&path),
        Err(Error::DataLoad { .. })
    ));

    fs::write(
        &path,
        "id,name,latitude,longitude\np1,Somewhere,10.0,0.0\np1,Elsewhere,11.0,0.0\n",
    )
    .expect("write csv");
    let err = GazetteerStore::load(&path).unwrap_err();
    assert!(err.to_string().contains("duplicate"), "{err}");
}

#[test]
fn header_only_gazetteer_is_empty_data() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("empty.csv");
    fs::write(&path, "id,name,latitude,longitude\n").expect("write csv");
    assert!(matches!(
        GazetteerStore::load(&path),
        Err(Error::DataLoad { .. })
    ));
}

#[test]
fn missing_network_file_is_a_data_load_error() {
    let dir = tempdir().expect("temp dir");
    let err = RoadNetworkGraph::load(&dir.path().join("absent.db")).unwrap_err();
    assert!(matches!(err, Error::DataLoad { .. }), "{err:?}");
}

#[test]
fn non_sqlite_file_is_a_data_load_error() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("garbage.db");
    fs::write(&path, b"this is not a database at all, not even close").expect("write file");
    let err = RoadNetworkGraph::load(&path).unwrap_err();
    assert!(matches!(err, Error::DataLoad { .. }), "{err:?}");
}

#[test]
fn missing_edges_table_is_reported() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("nodes_only.db");
    let conn = Connection::open(&path).expect("open");
    conn.execute_batch(
        "CREATE TABLE nodes (node_id INTEGER, latitude REAL, longitude REAL);
         INSERT INTO nodes VALUES (1, 40.0, -75.0);",
    )
    .expect("schema");
    drop(conn);

    let err = RoadNetworkGraph::load(&path).unwrap_err();
    assert!(err.to_string().contains("edges"), "{err}");
}

#[test]
fn minimal_schema_defaults_optional_columns() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("minimal.db");
    let conn = Connection::open(&path).expect("open");
    conn.execute_batch(
        "CREATE TABLE nodes (node_id INTEGER, latitude REAL, longitude REAL);
         CREATE TABLE edges (edge_id INTEGER, from_node INTEGER, to_node INTEGER, length_m REAL);
         INSERT INTO nodes VALUES (1, 40.0, -75.0), (2, 40.0, -75.01);
         INSERT INTO edges VALUES (7, 1, 2, 850.0);",
    )
    .expect("schema");
    drop(conn);

    let graph = RoadNetworkGraph::load(&path).expect("loads");
    let edge = graph.edge(7).expect("edge present");
    assert!(edge.is_bidirectional);
    assert_eq!(edge.traversal_cost, 850.0);
    assert_eq!(edge.name, None);
    assert_eq!(graph.neighbours(2).count(), 1);
}

#[test]
fn dangling_edge_is_rejected() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("dangling.db");
    let conn = Connection::open(&path).expect("open");
    conn.execute_batch(
        "CREATE TABLE nodes (node_id INTEGER, latitude REAL, longitude REAL);
         CREATE TABLE edges (edge_id INTEGER, from_node INTEGER, to_node INTEGER, length_m REAL);
         INSERT INTO nodes VALUES (1, 40.0, -75.0);
         INSERT INTO edges VALUES (1, 1, 99, 850.0);",
    )
    .expect("schema");
    drop(conn);

    let err = RoadNetworkGraph::load(&path).unwrap_err();
    assert!(matches!(err, Error::DataLoad { .. }));
    assert!(err.to_string().contains("unknown node 99"), "{err}");
}

#[test]
fn negative_lengths_are_rejected() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("negative.db");
    let conn = Connection::open(&path).expect("open");
    conn.execute_batch(
        "CREATE TABLE nodes (node_id INTEGER, latitude REAL, longitude REAL);
         CREATE TABLE edges (edge_id INTEGER, from_node INTEGER, to_node INTEGER, length_m REAL);
         INSERT INTO nodes VALUES (1, 40.0, -75.0), (2, 40.0, -75.01);
         INSERT INTO edges VALUES (1, 1, 2, -5.0);",
    )
    .expect("schema");
    drop(conn);

    assert!(matches!(
        RoadNetworkGraph::load(&path),
        Err(Error::DataLoad { .. })
    ));
}

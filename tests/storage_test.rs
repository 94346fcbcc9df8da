use std::path::PathBuf;

use rusqlite::Connection;
use tempfile::TempDir;

use relgraph::errors::GraphError;
use relgraph::graph::MemoryGraph;
use relgraph::storage::{Backend, SqliteBackend};
use relgraph::types::{Direction, Edge, Node};

/// Helper: a fresh database path inside a temp dir.
fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("graph.db")
}

/// Helper: commit a node and an optional edge through one transaction each.
fn seed_follow_graph(backend: &mut SqliteBackend) {
    let mut tx = backend.begin().expect("begin");
    tx.save_node(&Node::new("a", "user")).expect("save a");
    tx.save_node(&Node::new("b", "user")).expect("save b");
    tx.save_edge(&Edge::new("a", "b", "follows")).expect("save edge");
    tx.commit().expect("commit");
}

#[test]
fn test_open_initializes_store() {
    let dir = TempDir::new().expect("temp dir");
    // Parent directories are created on demand.
    let path = dir.path().join("nested").join("graph.db");

    let mut backend = SqliteBackend::open(&path).expect("open");
    let stats = backend.stats().expect("stats");
    assert_eq!(stats.node_count, 0);
    assert_eq!(stats.edge_count, 0);

    backend.close().expect("close");
    // Closing twice is harmless.
    backend.close().expect("second close");
}

#[test]
fn test_reopen_existing_store() {
    let dir = TempDir::new().expect("temp dir");
    let path = db_path(&dir);

    let mut backend = SqliteBackend::open(&path).expect("open");
    seed_follow_graph(&mut backend);
    backend.close().expect("close");

    let mut backend = SqliteBackend::open(&path).expect("reopen");
    let stats = backend.stats().expect("stats");
    assert_eq!(stats.node_count, 2);
    assert_eq!(stats.edge_count, 1);
    backend.close().expect("close");
}

#[test]
fn test_unknown_format_version_refused() {
    let dir = TempDir::new().expect("temp dir");
    let path = db_path(&dir);

    let mut backend = SqliteBackend::open(&path).expect("open");
    backend.close().expect("close");

    let conn = Connection::open(&path).expect("raw open");
    conn.execute("UPDATE meta SET value = '9.9' WHERE key = 'version'", [])
        .expect("tamper with version");
    drop(conn);

    match SqliteBackend::open(&path) {
        Err(GraphError::UnsupportedVersion(version)) => assert_eq!(version, "9.9"),
        other => panic!("expected UnsupportedVersion, got {other:?}"),
    }
}

#[test]
fn test_rollback_discards_mutations() {
    let dir = TempDir::new().expect("temp dir");
    let mut backend = SqliteBackend::open(&db_path(&dir)).expect("open");

    let mut tx = backend.begin().expect("begin");
    tx.save_node(&Node::new("a", "user")).expect("save");
    tx.save_node(&Node::new("b", "user")).expect("save");
    tx.rollback().expect("rollback");

    let graph = backend.load_graph().expect("load");
    assert!(graph.nodes().expect("nodes").is_empty());
    backend.close().expect("close");
}

#[test]
fn test_dropped_transaction_rolls_back() {
    let dir = TempDir::new().expect("temp dir");
    let mut backend = SqliteBackend::open(&db_path(&dir)).expect("open");

    {
        let mut tx = backend.begin().expect("begin");
        tx.save_node(&Node::new("a", "user")).expect("save");
        // Dropped without commit.
    }

    let graph = backend.load_graph().expect("load");
    assert!(graph.nodes().expect("nodes").is_empty());
    backend.close().expect("close");
}

#[test]
fn test_durability_round_trip() {
    let dir = TempDir::new().expect("temp dir");
    let path = db_path(&dir);

    let mut backend = SqliteBackend::open(&path).expect("open");
    seed_follow_graph(&mut backend);
    backend.close().expect("close");

    let mut backend = SqliteBackend::open(&path).expect("reopen");
    let graph = backend.load_graph().expect("load");

    let ids: Vec<String> = graph.nodes().expect("nodes").into_iter().map(|n| n.id).collect();
    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);

    let neighbors = graph.neighbors("a", Direction::Out).expect("neighbors");
    assert_eq!(neighbors.len(), 1);
    assert_eq!(neighbors[0].id, "b");
    backend.close().expect("close");
}

#[test]
fn test_colon_ids_round_trip_distinctly() {
    let dir = TempDir::new().expect("temp dir");
    let path = db_path(&dir);

    let mut backend = SqliteBackend::open(&path).expect("open");
    let mut tx = backend.begin().expect("begin");
    for id in ["user:alice", "user:bob", "user", "alice:user:bob"] {
        tx.save_node(&Node::new(id, "user")).expect("save node");
    }
    // Under a separator-joined key these two would collide.
    tx.save_edge(&Edge::new("user:alice", "user:bob", "follows"))
        .expect("save edge");
    tx.save_edge(&Edge::new("user", "alice:user:bob", "follows"))
        .expect("save edge");
    tx.commit().expect("commit");
    backend.close().expect("close");

    let mut backend = SqliteBackend::open(&path).expect("reopen");
    let graph = backend.load_graph().expect("load");
    assert_eq!(graph.edges().expect("edges").len(), 2);
    graph
        .get_edge("user:alice", "user:bob", "follows")
        .expect("first edge survives");
    graph
        .get_edge("user", "alice:user:bob", "follows")
        .expect("second edge survives");
    backend.close().expect("close");
}

#[test]
fn test_delete_operations_remove_keys() {
    let dir = TempDir::new().expect("temp dir");
    let mut backend = SqliteBackend::open(&db_path(&dir)).expect("open");
    seed_follow_graph(&mut backend);

    let mut tx = backend.begin().expect("begin");
    tx.delete_edge("a", "b", "follows").expect("delete edge");
    tx.delete_node("b").expect("delete node");
    tx.commit().expect("commit");

    let graph = backend.load_graph().expect("load");
    let ids: Vec<String> = graph.nodes().expect("nodes").into_iter().map(|n| n.id).collect();
    assert_eq!(ids, vec!["a".to_string()]);
    assert!(graph.edges().expect("edges").is_empty());
    backend.close().expect("close");
}

#[test]
fn test_save_graph_snapshot_replaces_contents() {
    let dir = TempDir::new().expect("temp dir");
    let mut backend = SqliteBackend::open(&db_path(&dir)).expect("open");
    seed_follow_graph(&mut backend);

    let snapshot = MemoryGraph::new();
    snapshot.add_node(Node::new("x", "file")).expect("add");
    snapshot.add_node(Node::new("y", "file")).expect("add");
    snapshot.add_edge(Edge::new("x", "y", "contains")).expect("edge");
    backend.save_graph(&snapshot).expect("save_graph");

    let graph = backend.load_graph().expect("load");
    let ids: Vec<String> = graph.nodes().expect("nodes").into_iter().map(|n| n.id).collect();
    assert_eq!(ids, vec!["x".to_string(), "y".to_string()]);
    graph.get_edge("x", "y", "contains").expect("edge survives");
    backend.close().expect("close");
}

#[test]
fn test_stats_counts_and_timestamps() {
    let dir = TempDir::new().expect("temp dir");
    let mut backend = SqliteBackend::open(&db_path(&dir)).expect("open");
    seed_follow_graph(&mut backend);
    backend.load_graph().expect("load");

    let stats = backend.stats().expect("stats");
    assert_eq!(stats.node_count, 2);
    assert_eq!(stats.edge_count, 1);
    assert!(stats.database_size > 0);
    assert!(stats.last_saved > 0);
    assert!(stats.last_loaded > 0);
    backend.close().expect("close");
}

#[test]
fn test_load_rejects_undecodable_value() {
    let dir = TempDir::new().expect("temp dir");
    let path = db_path(&dir);

    let mut backend = SqliteBackend::open(&path).expect("open");
    backend.close().expect("close");

    let conn = Connection::open(&path).expect("raw open");
    conn.execute(
        "INSERT INTO nodes (key, value) VALUES ('bad', 'not json')",
        [],
    )
    .expect("insert garbage");
    drop(conn);

    let mut backend = SqliteBackend::open(&path).expect("reopen");
    assert!(matches!(
        backend.load_graph(),
        Err(GraphError::Storage(_))
    ));
    backend.close().expect("close");
}

#[test]
fn test_load_rejects_orphan_edge() {
    let dir = TempDir::new().expect("temp dir");
    let path = db_path(&dir);

    let mut backend = SqliteBackend::open(&path).expect("open");
    backend.close().expect("close");

    let conn = Connection::open(&path).expect("raw open");
    conn.execute(
        r#"INSERT INTO edges (key, value) VALUES ('5:ghost5:ghost1:l', '{"from":"ghost","to":"ghost","label":"l"}')"#,
        [],
    )
    .expect("insert orphan edge");
    drop(conn);

    let mut backend = SqliteBackend::open(&path).expect("reopen");
    assert!(matches!(
        backend.load_graph(),
        Err(GraphError::Storage(_))
    ));
    backend.close().expect("close");
}

#[test]
fn test_closed_backend_rejects_operations() {
    let dir = TempDir::new().expect("temp dir");
    let mut backend = SqliteBackend::open(&db_path(&dir)).expect("open");
    backend.close().expect("close");

    assert!(backend.begin().is_err());
    assert!(backend.load_graph().is_err());
    assert!(backend.stats().is_err());
}

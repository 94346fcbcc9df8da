use relgraph::errors::GraphError;
use relgraph::graph::MemoryGraph;
use relgraph::types::{Direction, Edge, Node};

/// Helper: node with one property.
fn node_with_prop(id: &str, node_type: &str, key: &str, value: &str) -> Node {
    let mut node = Node::new(id, node_type);
    node.props.insert(key.to_string(), value.to_string());
    node
}

/// Sets up the follow graph used by several tests: a -> b [follows].
fn setup_follow_graph() -> MemoryGraph {
    let graph = MemoryGraph::new();
    graph.add_node(Node::new("a", "user")).expect("add a");
    graph.add_node(Node::new("b", "user")).expect("add b");
    graph
        .add_edge(Edge::new("a", "b", "follows"))
        .expect("add edge");
    graph
}

// ---------------------------------------------------------------------------
// Node operations
// ---------------------------------------------------------------------------

#[test]
fn test_add_and_get_node() {
    let graph = MemoryGraph::new();
    let node = node_with_prop("user:alice", "user", "name", "Alice");
    graph.add_node(node.clone()).expect("add_node failed");

    let fetched = graph.get_node("user:alice").expect("get_node failed");
    assert_eq!(fetched, node);
}

#[test]
fn test_get_node_returns_snapshot() {
    let graph = MemoryGraph::new();
    graph
        .add_node(node_with_prop("a", "user", "name", "Alice"))
        .expect("add_node failed");

    let mut copy = graph.get_node("a").expect("get_node failed");
    copy.props.insert("name".to_string(), "Mallory".to_string());

    let fetched = graph.get_node("a").expect("get_node failed");
    assert_eq!(fetched.props.get("name").map(String::as_str), Some("Alice"));
}

#[test]
fn test_add_node_empty_id_rejected() {
    let graph = MemoryGraph::new();
    assert!(matches!(
        graph.add_node(Node::new("", "user")),
        Err(GraphError::EmptyNodeId)
    ));
}

#[test]
fn test_add_node_duplicate_rejected() {
    let graph = MemoryGraph::new();
    graph.add_node(Node::new("a", "user")).expect("first add");
    assert!(matches!(
        graph.add_node(Node::new("a", "other")),
        Err(GraphError::NodeExists(_))
    ));

    // The original node is untouched.
    let fetched = graph.get_node("a").expect("get_node failed");
    assert_eq!(fetched.node_type, "user");
}

#[test]
fn test_get_node_not_found() {
    let graph = MemoryGraph::new();
    assert!(matches!(
        graph.get_node("ghost"),
        Err(GraphError::NodeNotFound(_))
    ));
}

#[test]
fn test_remove_node_not_found() {
    let graph = MemoryGraph::new();
    assert!(matches!(
        graph.remove_node("ghost"),
        Err(GraphError::NodeNotFound(_))
    ));
}

// ---------------------------------------------------------------------------
// Edge operations
// ---------------------------------------------------------------------------

#[test]
fn test_add_and_get_edge() {
    let graph = setup_follow_graph();
    let edge = graph.get_edge("a", "b", "follows").expect("get_edge failed");
    assert_eq!(edge.from, "a");
    assert_eq!(edge.to, "b");
    assert_eq!(edge.label, "follows");
}

#[test]
fn test_add_edge_missing_endpoint() {
    let graph = MemoryGraph::new();
    graph.add_node(Node::new("a", "")).expect("add a");

    assert!(matches!(
        graph.add_edge(Edge::new("a", "ghost", "follows")),
        Err(GraphError::NodeNotFound(_))
    ));
    assert!(matches!(
        graph.add_edge(Edge::new("ghost", "a", "follows")),
        Err(GraphError::NodeNotFound(_))
    ));
}

#[test]
fn test_add_edge_validation() {
    let graph = MemoryGraph::new();
    assert!(matches!(
        graph.add_edge(Edge::new("", "b", "l")),
        Err(GraphError::EmptyFromNode)
    ));
    assert!(matches!(
        graph.add_edge(Edge::new("a", "", "l")),
        Err(GraphError::EmptyToNode)
    ));
    assert!(matches!(
        graph.add_edge(Edge::new("a", "b", "")),
        Err(GraphError::EmptyEdgeLabel)
    ));
}

#[test]
fn test_multigraph_labels() {
    let graph = setup_follow_graph();

    // Same endpoints, different label: fine.
    graph
        .add_edge(Edge::new("a", "b", "likes"))
        .expect("parallel edge with distinct label");

    // Same triple: conflict.
    assert!(matches!(
        graph.add_edge(Edge::new("a", "b", "follows")),
        Err(GraphError::EdgeExists { .. })
    ));

    // Parallel edges still collapse to one neighbor.
    let neighbors = graph.neighbors("a", Direction::Out).expect("neighbors");
    assert_eq!(neighbors.len(), 1);
    assert_eq!(neighbors[0].id, "b");
}

#[test]
fn test_get_edge_not_found() {
    let graph = setup_follow_graph();
    assert!(matches!(
        graph.get_edge("a", "b", "likes"),
        Err(GraphError::EdgeNotFound { .. })
    ));
}

#[test]
fn test_remove_edge() {
    let graph = setup_follow_graph();
    let removed = graph.remove_edge("a", "b", "follows").expect("remove_edge");
    assert_eq!(removed.label, "follows");

    assert!(matches!(
        graph.get_edge("a", "b", "follows"),
        Err(GraphError::EdgeNotFound { .. })
    ));
    assert!(matches!(
        graph.remove_edge("a", "b", "follows"),
        Err(GraphError::EdgeNotFound { .. })
    ));

    // Indexes are clean: no lingering neighbors either way.
    assert!(graph.neighbors("a", Direction::Both).expect("n").is_empty());
    assert!(graph.neighbors("b", Direction::Both).expect("n").is_empty());
}

// ---------------------------------------------------------------------------
// Cascade delete
// ---------------------------------------------------------------------------

#[test]
fn test_delete_node_cascades_to_edges() {
    let graph = setup_follow_graph();

    let (node, removed) = graph.remove_node("a").expect("remove_node");
    assert_eq!(node.id, "a");
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].label, "follows");

    assert!(matches!(
        graph.get_edge("a", "b", "follows"),
        Err(GraphError::EdgeNotFound { .. })
    ));
    assert!(graph.neighbors("b", Direction::In).expect("n").is_empty());
}

#[test]
fn test_delete_node_cascades_both_directions_and_self_loop() {
    let graph = MemoryGraph::new();
    for id in ["hub", "x", "y"] {
        graph.add_node(Node::new(id, "")).expect("add node");
    }
    graph.add_edge(Edge::new("hub", "x", "out")).expect("edge");
    graph.add_edge(Edge::new("y", "hub", "in")).expect("edge");
    graph.add_edge(Edge::new("hub", "hub", "self")).expect("edge");

    let (_, removed) = graph.remove_node("hub").expect("remove_node");
    assert_eq!(removed.len(), 3);

    // Peers keep no stale index entries.
    assert!(graph.neighbors("x", Direction::Both).expect("n").is_empty());
    assert!(graph.neighbors("y", Direction::Both).expect("n").is_empty());
    assert!(graph.edges().expect("edges").is_empty());
}

// ---------------------------------------------------------------------------
// Neighbors
// ---------------------------------------------------------------------------

#[test]
fn test_directed_neighbors() {
    let graph = setup_follow_graph();

    let out_a = graph.neighbors("a", Direction::Out).expect("out a");
    assert_eq!(out_a.len(), 1);
    assert_eq!(out_a[0].id, "b");

    assert!(graph.neighbors("b", Direction::Out).expect("out b").is_empty());

    let in_b = graph.neighbors("b", Direction::In).expect("in b");
    assert_eq!(in_b.len(), 1);
    assert_eq!(in_b[0].id, "a");
}

#[test]
fn test_neighbors_both_is_union() {
    let graph = MemoryGraph::new();
    for id in ["m", "p", "q"] {
        graph.add_node(Node::new(id, "")).expect("add node");
    }
    graph.add_edge(Edge::new("m", "p", "l1")).expect("edge");
    graph.add_edge(Edge::new("q", "m", "l2")).expect("edge");
    // p is both an out- and in-neighbor; listed once.
    graph.add_edge(Edge::new("p", "m", "l3")).expect("edge");

    let both: Vec<String> = graph
        .neighbors("m", Direction::Both)
        .expect("neighbors")
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(both, vec!["p".to_string(), "q".to_string()]);
}

#[test]
fn test_neighbors_unknown_node() {
    let graph = MemoryGraph::new();
    assert!(matches!(
        graph.neighbors("ghost", Direction::Both),
        Err(GraphError::NodeNotFound(_))
    ));
}

#[test]
fn test_neighbors_matches_out_edges_index() {
    let graph = MemoryGraph::new();
    for id in ["a", "b", "c", "d"] {
        graph.add_node(Node::new(id, "")).expect("add node");
    }
    graph.add_edge(Edge::new("a", "b", "x")).expect("edge");
    graph.add_edge(Edge::new("a", "c", "x")).expect("edge");
    graph.add_edge(Edge::new("a", "c", "y")).expect("edge");
    graph.add_edge(Edge::new("d", "a", "x")).expect("edge");

    let out: Vec<String> = graph
        .neighbors("a", Direction::Out)
        .expect("neighbors")
        .into_iter()
        .map(|n| n.id)
        .collect();

    let mut expected: Vec<String> = graph
        .edges()
        .expect("edges")
        .into_iter()
        .filter(|e| e.from == "a")
        .map(|e| e.to)
        .collect();
    expected.sort();
    expected.dedup();

    assert_eq!(out, expected);
}

// ---------------------------------------------------------------------------
// Type index
// ---------------------------------------------------------------------------

#[test]
fn test_nodes_by_type() {
    let graph = MemoryGraph::new();
    graph.add_node(Node::new("u1", "user")).expect("add");
    graph.add_node(Node::new("u2", "user")).expect("add");
    graph.add_node(Node::new("f1", "file")).expect("add");
    graph.add_node(Node::new("untyped", "")).expect("add");

    let users: Vec<String> = graph
        .nodes_by_type("user")
        .expect("nodes_by_type")
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(users, vec!["u1".to_string(), "u2".to_string()]);

    // Unknown type is an empty list, not an error.
    assert!(graph.nodes_by_type("module").expect("n").is_empty());
    // Untyped nodes live in no bucket.
    assert!(graph.nodes_by_type("").expect("n").is_empty());
}

#[test]
fn test_type_index_updated_on_delete() {
    let graph = MemoryGraph::new();
    graph.add_node(Node::new("u1", "user")).expect("add");
    graph.add_node(Node::new("u2", "user")).expect("add");

    graph.remove_node("u1").expect("remove");
    let users = graph.nodes_by_type("user").expect("nodes_by_type");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, "u2");

    graph.remove_node("u2").expect("remove");
    assert!(graph.nodes_by_type("user").expect("n").is_empty());
}

// ---------------------------------------------------------------------------
// Iteration and lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_iteration_is_sorted() {
    let graph = MemoryGraph::new();
    for id in ["c", "a", "b"] {
        graph.add_node(Node::new(id, "")).expect("add");
    }
    graph.add_edge(Edge::new("c", "a", "z")).expect("edge");
    graph.add_edge(Edge::new("a", "b", "z")).expect("edge");

    let ids: Vec<String> = graph.nodes().expect("nodes").into_iter().map(|n| n.id).collect();
    assert_eq!(ids, vec!["a".to_string(), "b".to_string(), "c".to_string()]);

    let froms: Vec<String> = graph.edges().expect("edges").into_iter().map(|e| e.from).collect();
    assert_eq!(froms, vec!["a".to_string(), "c".to_string()]);
}

#[test]
fn test_closed_graph_rejects_operations() {
    let graph = setup_follow_graph();
    graph.close();

    assert!(matches!(
        graph.add_node(Node::new("z", "")),
        Err(GraphError::GraphClosed)
    ));
    assert!(matches!(graph.get_node("a"), Err(GraphError::GraphClosed)));
    assert!(matches!(graph.remove_node("a"), Err(GraphError::GraphClosed)));
    assert!(matches!(
        graph.add_edge(Edge::new("a", "b", "x")),
        Err(GraphError::GraphClosed)
    ));
    assert!(matches!(
        graph.neighbors("a", Direction::Out),
        Err(GraphError::GraphClosed)
    ));
    assert!(matches!(graph.nodes(), Err(GraphError::GraphClosed)));
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::{GraphError, Result};

/// A graph node: unique string ID, optional classification type, and
/// free-form string properties.
///
/// The empty string type means "untyped". Empty type and props are omitted
/// from the serialized form, both on the wire and on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub props: HashMap<String, String>,
}

impl Node {
    /// Creates a node with the given id and type and no properties.
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            props: HashMap::new(),
        }
    }

    /// Checks that the node is well-formed.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(GraphError::EmptyNodeId);
        }
        Ok(())
    }
}

/// A directed, labeled edge between two nodes, identified by the triple
/// `(from, to, label)`. Distinct labels between the same endpoints are
/// distinct edges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub props: HashMap<String, String>,
}

impl Edge {
    /// Creates an edge with the given endpoints and label and no properties.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: label.into(),
            props: HashMap::new(),
        }
    }

    /// Checks that the edge is well-formed.
    pub fn validate(&self) -> Result<()> {
        if self.from.is_empty() {
            return Err(GraphError::EmptyFromNode);
        }
        if self.to.is_empty() {
            return Err(GraphError::EmptyToNode);
        }
        if self.label.is_empty() {
            return Err(GraphError::EmptyEdgeLabel);
        }
        Ok(())
    }
}

/// Direction of edge traversal relative to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
    Both,
}

impl Direction {
    /// Returns the string representation of this direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::Both => "both",
        }
    }

    /// Parses a direction string, rejecting anything but `in`, `out`, `both`.
    pub fn parse(s: &str) -> Result<Direction> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            "both" => Ok(Direction::Both),
            other => Err(GraphError::InvalidDirection(other.to_string())),
        }
    }
}

/// One of the three supported query kinds.
#[derive(Debug, Clone)]
pub enum Query {
    /// Nodes reachable over a single edge of the given orientation,
    /// optionally restricted to one edge label.
    Neighbors {
        node: String,
        direction: Direction,
        label: Option<String>,
    },
    /// All simple directed paths from `from` to `to` with at most
    /// `max_depth` edges. A `max_depth` of 0 selects the default.
    Paths {
        from: String,
        to: String,
        max_depth: usize,
    },
    /// Nodes matching every filter; the `type` filter anchors the search
    /// on the type index, remaining keys match properties exactly.
    Find { filters: HashMap<String, String> },
}

/// A path through the graph: `edges.len() == nodes.len() - 1`, with
/// `edges[i]` connecting `nodes[i]` to `nodes[i + 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Result of a graph query. Neighbor and find queries populate `nodes`;
/// path queries populate `paths`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<Path>,
}

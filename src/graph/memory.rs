use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::{GraphError, Result};
use crate::types::{Direction, Edge, Node, Query, QueryResult};

use super::Graph;

/// Identity of an edge: the `(from, to, label)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct EdgeKey {
    pub(crate) from: String,
    pub(crate) to: String,
    pub(crate) label: String,
}

impl EdgeKey {
    fn new(from: &str, to: &str, label: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            label: label.to_string(),
        }
    }
}

/// Primary storage plus the derived indexes, guarded by the outer lock.
///
/// `by_type` holds node ids per non-empty type tag; `out_edges` and
/// `in_edges` hold edge keys per endpoint. Empty index entries are removed
/// so the maps never accumulate tombstones.
#[derive(Debug, Default)]
pub(crate) struct GraphInner {
    nodes: HashMap<String, Node>,
    edges: HashMap<EdgeKey, Edge>,
    by_type: HashMap<String, HashSet<String>>,
    out_edges: HashMap<String, HashSet<EdgeKey>>,
    in_edges: HashMap<String, HashSet<EdgeKey>>,
    closed: bool,
}

impl GraphInner {
    pub(crate) fn guard_open(&self) -> Result<()> {
        if self.closed {
            return Err(GraphError::GraphClosed);
        }
        Ok(())
    }

    pub(crate) fn node_or_err(&self, id: &str) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    /// Deduplicated neighbors over edges of the requested orientation,
    /// optionally restricted to one edge label. Ordered by node id.
    pub(crate) fn neighbors_of(
        &self,
        id: &str,
        direction: Direction,
        label: Option<&str>,
    ) -> Result<Vec<Node>> {
        self.node_or_err(id)?;

        let mut found: BTreeMap<&str, &Node> = BTreeMap::new();

        if matches!(direction, Direction::Out | Direction::Both) {
            if let Some(keys) = self.out_edges.get(id) {
                for key in keys {
                    if label.is_some_and(|l| l != key.label) {
                        continue;
                    }
                    if let Some(node) = self.nodes.get(&key.to) {
                        found.insert(node.id.as_str(), node);
                    }
                }
            }
        }
        if matches!(direction, Direction::In | Direction::Both) {
            if let Some(keys) = self.in_edges.get(id) {
                for key in keys {
                    if label.is_some_and(|l| l != key.label) {
                        continue;
                    }
                    if let Some(node) = self.nodes.get(&key.from) {
                        found.insert(node.id.as_str(), node);
                    }
                }
            }
        }

        Ok(found.into_values().cloned().collect())
    }

    /// All nodes with the given type tag, ordered by id. Unknown types
    /// yield an empty list, not an error.
    pub(crate) fn nodes_of_type(&self, node_type: &str) -> Vec<Node> {
        let mut nodes: Vec<Node> = match self.by_type.get(node_type) {
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.nodes.get(id))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// Deduplicated out-neighbor ids of a node, ordered.
    pub(crate) fn out_neighbor_ids(&self, id: &str) -> Vec<&str> {
        let mut ids: Vec<&str> = match self.out_edges.get(id) {
            Some(keys) => keys.iter().map(|k| k.to.as_str()).collect(),
            None => Vec::new(),
        };
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// The edge connecting `from` to `to` with the lowest label, if any.
    pub(crate) fn connecting_edge(&self, from: &str, to: &str) -> Option<&Edge> {
        self.out_edges
            .get(from)?
            .iter()
            .filter(|key| key.to == to)
            .min_by(|a, b| a.label.cmp(&b.label))
            .and_then(|key| self.edges.get(key))
    }
}

/// The indexed in-memory graph core.
///
/// Guarantees O(1) node and edge lookup and O(k) neighbor enumeration.
/// Readers share the interior lock; writers are exclusive. All returned
/// nodes and edges are snapshot copies.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    inner: RwLock<GraphInner>,
}

impl MemoryGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock means a panic mid-operation; the data itself is
    // still structurally sound, so recover the guard instead of wedging
    // every subsequent caller.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, GraphInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GraphInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a node, updating the type index for non-empty types.
    pub fn add_node(&self, node: Node) -> Result<()> {
        node.validate()?;

        let mut inner = self.write();
        inner.guard_open()?;

        if inner.nodes.contains_key(&node.id) {
            return Err(GraphError::NodeExists(node.id));
        }

        if !node.node_type.is_empty() {
            inner
                .by_type
                .entry(node.node_type.clone())
                .or_default()
                .insert(node.id.clone());
        }
        inner.nodes.insert(node.id.clone(), node);

        Ok(())
    }

    /// Returns a snapshot copy of a node.
    pub fn get_node(&self, id: &str) -> Result<Node> {
        let inner = self.read();
        inner.guard_open()?;
        inner.node_or_err(id).cloned()
    }

    /// Removes a node and every incident edge, returning the removed node
    /// and edges so the caller can invert the mutation or cascade it to
    /// durable storage.
    pub fn remove_node(&self, id: &str) -> Result<(Node, Vec<Edge>)> {
        let mut guard = self.write();
        let inner = &mut *guard;
        inner.guard_open()?;

        let node = match inner.nodes.remove(id) {
            Some(node) => node,
            None => return Err(GraphError::NodeNotFound(id.to_string())),
        };

        // Incident edge keys; a self-loop appears in both sets once.
        let mut keys: HashSet<EdgeKey> = inner.out_edges.remove(id).unwrap_or_default();
        if let Some(incoming) = inner.in_edges.remove(id) {
            keys.extend(incoming);
        }

        let mut removed = Vec::with_capacity(keys.len());
        for key in &keys {
            if let Some(edge) = inner.edges.remove(key) {
                removed.push(edge);
            }
            // Detach from the peer's indexes; entries for `id` itself are
            // already gone.
            if let Some(set) = inner.out_edges.get_mut(&key.from) {
                set.remove(key);
                if set.is_empty() {
                    inner.out_edges.remove(&key.from);
                }
            }
            if let Some(set) = inner.in_edges.get_mut(&key.to) {
                set.remove(key);
                if set.is_empty() {
                    inner.in_edges.remove(&key.to);
                }
            }
        }

        if !node.node_type.is_empty() {
            if let Some(ids) = inner.by_type.get_mut(&node.node_type) {
                ids.remove(id);
                if ids.is_empty() {
                    inner.by_type.remove(&node.node_type);
                }
            }
        }

        Ok((node, removed))
    }

    /// Inserts an edge between two existing nodes.
    pub fn add_edge(&self, edge: Edge) -> Result<()> {
        edge.validate()?;

        let mut inner = self.write();
        inner.guard_open()?;

        if !inner.nodes.contains_key(&edge.from) {
            return Err(GraphError::NodeNotFound(edge.from));
        }
        if !inner.nodes.contains_key(&edge.to) {
            return Err(GraphError::NodeNotFound(edge.to));
        }

        let key = EdgeKey::new(&edge.from, &edge.to, &edge.label);
        if inner.edges.contains_key(&key) {
            return Err(GraphError::EdgeExists {
                from: edge.from,
                to: edge.to,
                label: edge.label,
            });
        }

        inner
            .out_edges
            .entry(edge.from.clone())
            .or_default()
            .insert(key.clone());
        inner
            .in_edges
            .entry(edge.to.clone())
            .or_default()
            .insert(key.clone());
        inner.edges.insert(key, edge);

        Ok(())
    }

    /// Returns a snapshot copy of an edge.
    pub fn get_edge(&self, from: &str, to: &str, label: &str) -> Result<Edge> {
        let inner = self.read();
        inner.guard_open()?;

        let key = EdgeKey::new(from, to, label);
        inner
            .edges
            .get(&key)
            .cloned()
            .ok_or_else(|| GraphError::EdgeNotFound {
                from: from.to_string(),
                to: to.to_string(),
                label: label.to_string(),
            })
    }

    /// Removes a single edge, returning the removed value.
    pub fn remove_edge(&self, from: &str, to: &str, label: &str) -> Result<Edge> {
        let mut guard = self.write();
        let inner = &mut *guard;
        inner.guard_open()?;

        let key = EdgeKey::new(from, to, label);
        let edge = match inner.edges.remove(&key) {
            Some(edge) => edge,
            None => {
                return Err(GraphError::EdgeNotFound {
                    from: from.to_string(),
                    to: to.to_string(),
                    label: label.to_string(),
                })
            }
        };

        if let Some(set) = inner.out_edges.get_mut(from) {
            set.remove(&key);
            if set.is_empty() {
                inner.out_edges.remove(from);
            }
        }
        if let Some(set) = inner.in_edges.get_mut(to) {
            set.remove(&key);
            if set.is_empty() {
                inner.in_edges.remove(to);
            }
        }

        Ok(edge)
    }

    /// Deduplicated neighbor set of a node, ordered by id.
    pub fn neighbors(&self, id: &str, direction: Direction) -> Result<Vec<Node>> {
        let inner = self.read();
        inner.guard_open()?;
        inner.neighbors_of(id, direction, None)
    }

    /// All nodes with the given type tag, ordered by id.
    pub fn nodes_by_type(&self, node_type: &str) -> Result<Vec<Node>> {
        let inner = self.read();
        inner.guard_open()?;
        Ok(inner.nodes_of_type(node_type))
    }

    /// Snapshot of every node, ordered by id.
    pub fn nodes(&self) -> Result<Vec<Node>> {
        let inner = self.read();
        inner.guard_open()?;

        let mut nodes: Vec<Node> = inner.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(nodes)
    }

    /// Snapshot of every edge, ordered by `(from, to, label)`.
    pub fn edges(&self) -> Result<Vec<Edge>> {
        let inner = self.read();
        inner.guard_open()?;

        let mut edges: Vec<Edge> = inner.edges.values().cloned().collect();
        edges.sort_by(|a, b| {
            (&a.from, &a.to, &a.label).cmp(&(&b.from, &b.to, &b.label))
        });
        Ok(edges)
    }

    /// Marks the graph closed.
    pub fn close(&self) {
        self.write().closed = true;
    }
}

impl Graph for MemoryGraph {
    fn add_node(&self, node: Node) -> Result<()> {
        MemoryGraph::add_node(self, node)
    }

    fn get_node(&self, id: &str) -> Result<Node> {
        MemoryGraph::get_node(self, id)
    }

    fn delete_node(&self, id: &str) -> Result<()> {
        self.remove_node(id).map(|_| ())
    }

    fn add_edge(&self, edge: Edge) -> Result<()> {
        MemoryGraph::add_edge(self, edge)
    }

    fn get_edge(&self, from: &str, to: &str, label: &str) -> Result<Edge> {
        MemoryGraph::get_edge(self, from, to, label)
    }

    fn delete_edge(&self, from: &str, to: &str, label: &str) -> Result<()> {
        self.remove_edge(from, to, label).map(|_| ())
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Result<Vec<Node>> {
        MemoryGraph::neighbors(self, id, direction)
    }

    fn nodes_by_type(&self, node_type: &str) -> Result<Vec<Node>> {
        MemoryGraph::nodes_by_type(self, node_type)
    }

    fn nodes(&self) -> Result<Vec<Node>> {
        MemoryGraph::nodes(self)
    }

    fn edges(&self) -> Result<Vec<Edge>> {
        MemoryGraph::edges(self)
    }

    fn query(&self, query: &Query) -> Result<QueryResult> {
        self.run_query(query)
    }

    fn close(&self) -> Result<()> {
        MemoryGraph::close(self);
        Ok(())
    }
}

/// Indexed in-memory graph core.
pub mod memory;

/// Query algorithms for neighbor, path, and find queries.
pub mod query;

pub use memory::MemoryGraph;
pub use query::{DEFAULT_MAX_DEPTH, MAX_PATH_DEPTH};

use crate::errors::Result;
use crate::types::{Direction, Edge, Node, Query, QueryResult};

/// Store-agnostic graph contract.
///
/// Implemented by [`MemoryGraph`] for in-memory operation and by
/// [`crate::storage::PersistentGraph`] for write-through persistent
/// operation; the MCP dispatcher only ever sees this trait.
pub trait Graph: Send + Sync {
    /// Inserts a node. Fails if the id is empty or already present.
    fn add_node(&self, node: Node) -> Result<()>;

    /// Returns a snapshot copy of the node with the given id.
    fn get_node(&self, id: &str) -> Result<Node>;

    /// Removes a node and every edge incident to it.
    fn delete_node(&self, id: &str) -> Result<()>;

    /// Inserts an edge. Both endpoints must exist; the `(from, to, label)`
    /// triple must not already be present.
    fn add_edge(&self, edge: Edge) -> Result<()>;

    /// Returns a snapshot copy of the edge with the given identity.
    fn get_edge(&self, from: &str, to: &str, label: &str) -> Result<Edge>;

    /// Removes a single edge by its identity triple.
    fn delete_edge(&self, from: &str, to: &str, label: &str) -> Result<()>;

    /// Returns the deduplicated neighbor set of a node.
    fn neighbors(&self, id: &str, direction: Direction) -> Result<Vec<Node>>;

    /// Returns all nodes carrying the given non-empty type tag.
    fn nodes_by_type(&self, node_type: &str) -> Result<Vec<Node>>;

    /// Returns a snapshot of every node, ordered by id.
    fn nodes(&self) -> Result<Vec<Node>>;

    /// Returns a snapshot of every edge, ordered by `(from, to, label)`.
    fn edges(&self) -> Result<Vec<Edge>>;

    /// Executes one of the three query kinds.
    fn query(&self, query: &Query) -> Result<QueryResult>;

    /// Marks the graph closed; every subsequent operation fails.
    fn close(&self) -> Result<()>;
}

/// Write-through wrapper composing the in-memory core with a backend.
pub mod persistent;

/// SQLite-backed key-value store implementation.
pub mod sqlite;

pub use persistent::PersistentGraph;
pub use sqlite::SqliteBackend;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::graph::MemoryGraph;
use crate::types::{Edge, Node};

/// Durable key-value backend holding the `nodes`, `edges`, and `meta`
/// keyspaces. Opening is backend-specific (see [`SqliteBackend::open`]);
/// everything after that goes through this trait so callers can swap in
/// fault-injecting fakes.
pub trait Backend: Send {
    /// Starts an atomic transaction.
    fn begin(&mut self) -> Result<Box<dyn StoreTx + '_>>;

    /// Replays the nodes keyspace, then the edges keyspace, into a fresh
    /// in-memory graph. Undecodable values and referential violations are
    /// errors.
    fn load_graph(&mut self) -> Result<MemoryGraph>;

    /// Replaces both data keyspaces with a snapshot of the given graph,
    /// atomically.
    fn save_graph(&mut self, graph: &MemoryGraph) -> Result<()>;

    /// Approximate size and content counters.
    fn stats(&mut self) -> Result<StoreStats>;

    /// Releases the store; subsequent operations fail.
    fn close(&mut self) -> Result<()>;
}

/// Atomic mutation handle: everything issued on one handle becomes visible
/// at `commit` or not at all. Dropping an uncommitted handle rolls back.
pub trait StoreTx {
    fn save_node(&mut self, node: &Node) -> Result<()>;
    fn delete_node(&mut self, id: &str) -> Result<()>;
    fn save_edge(&mut self, edge: &Edge) -> Result<()>;
    fn delete_edge(&mut self, from: &str, to: &str, label: &str) -> Result<()>;

    /// Commits the transaction, consuming the handle.
    fn commit(self: Box<Self>) -> Result<()>;

    /// Explicitly rolls back, consuming the handle.
    fn rollback(self: Box<Self>) -> Result<()>;
}

/// Storage statistics as reported by [`Backend::stats`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    /// Approximate database size in bytes.
    pub database_size: u64,
    pub node_count: u64,
    pub edge_count: u64,
    /// Epoch seconds of the last committed write; 0 if never.
    pub last_saved: i64,
    /// Epoch seconds of the last full load; 0 if never.
    pub last_loaded: i64,
}

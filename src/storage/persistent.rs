use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::error;

use crate::errors::{GraphError, Result};
use crate::graph::{Graph, MemoryGraph};
use crate::types::{Direction, Edge, Node, Query, QueryResult};

use super::{Backend, StoreTx};

/// Write-through wrapper composing the in-memory core with a durable
/// backend under one synchronization domain.
///
/// Every mutation is applied to memory first and then mirrored to the
/// backend in a single transaction; if any storage step fails, the memory
/// change is undone with the mechanical inverse built from captured
/// pre-state, so callers never observe a half-applied mutation. Reads
/// take the shared hold and never touch storage.
///
/// Lock order is fixed: the graph domain (`memory`) first, then the
/// storage handle.
pub struct PersistentGraph {
    memory: RwLock<MemoryGraph>,
    backend: Mutex<Box<dyn Backend>>,
}

impl PersistentGraph {
    /// Creates a persistent graph over the given backend with an empty
    /// in-memory core. Call [`load`](Self::load) to populate it.
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self {
            memory: RwLock::new(MemoryGraph::new()),
            backend: Mutex::new(backend),
        }
    }

    fn read_memory(&self) -> RwLockReadGuard<'_, MemoryGraph> {
        self.memory.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_memory(&self) -> RwLockWriteGuard<'_, MemoryGraph> {
        self.memory.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_backend(&self) -> MutexGuard<'_, Box<dyn Backend>> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the in-memory core with the graph reconstructed from
    /// storage. On error the core is left untouched; the caller may
    /// choose to keep serving the (empty) core.
    pub fn load(&self) -> Result<()> {
        let mut memory = self.write_memory();
        let mut backend = self.lock_backend();
        let loaded = backend
            .load_graph()
            .map_err(|e| GraphError::Storage(format!("failed to load from storage: {e}")))?;
        *memory = loaded;
        Ok(())
    }

    /// Writes a full snapshot of the current core to storage, replacing
    /// both data keyspaces. Not used on the live request path; the
    /// write-through discipline already keeps storage current.
    pub fn save(&self) -> Result<()> {
        let memory = self.read_memory();
        let mut backend = self.lock_backend();
        backend.save_graph(&memory)
    }
}

impl Graph for PersistentGraph {
    fn add_node(&self, node: Node) -> Result<()> {
        let memory = self.write_memory();
        memory.add_node(node.clone())?;

        let mut backend = self.lock_backend();
        if let Err(err) = persist_node_save(backend.as_mut(), &node) {
            if let Err(undo) = memory.remove_node(&node.id) {
                error!("failed to undo in-memory add of node '{}': {undo}", node.id);
            }
            return Err(err);
        }
        Ok(())
    }

    fn get_node(&self, id: &str) -> Result<Node> {
        self.read_memory().get_node(id)
    }

    fn delete_node(&self, id: &str) -> Result<()> {
        let memory = self.write_memory();
        let (node, edges) = memory.remove_node(id)?;

        let mut backend = self.lock_backend();
        if let Err(err) = persist_node_delete(backend.as_mut(), id, &edges) {
            restore_node(&memory, node, edges);
            return Err(err);
        }
        Ok(())
    }

    fn add_edge(&self, edge: Edge) -> Result<()> {
        let memory = self.write_memory();
        memory.add_edge(edge.clone())?;

        let mut backend = self.lock_backend();
        if let Err(err) = persist_edge_save(backend.as_mut(), &edge) {
            if let Err(undo) = memory.remove_edge(&edge.from, &edge.to, &edge.label) {
                error!(
                    "failed to undo in-memory add of edge '{}' -> '{}' [{}]: {undo}",
                    edge.from, edge.to, edge.label
                );
            }
            return Err(err);
        }
        Ok(())
    }

    fn get_edge(&self, from: &str, to: &str, label: &str) -> Result<Edge> {
        self.read_memory().get_edge(from, to, label)
    }

    fn delete_edge(&self, from: &str, to: &str, label: &str) -> Result<()> {
        let memory = self.write_memory();
        let removed = memory.remove_edge(from, to, label)?;

        let mut backend = self.lock_backend();
        if let Err(err) = persist_edge_delete(backend.as_mut(), from, to, label) {
            if let Err(undo) = memory.add_edge(removed) {
                error!(
                    "failed to undo in-memory delete of edge '{from}' -> '{to}' [{label}]: {undo}"
                );
            }
            return Err(err);
        }
        Ok(())
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Result<Vec<Node>> {
        self.read_memory().neighbors(id, direction)
    }

    fn nodes_by_type(&self, node_type: &str) -> Result<Vec<Node>> {
        self.read_memory().nodes_by_type(node_type)
    }

    fn nodes(&self) -> Result<Vec<Node>> {
        self.read_memory().nodes()
    }

    fn edges(&self) -> Result<Vec<Edge>> {
        self.read_memory().edges()
    }

    fn query(&self, query: &Query) -> Result<QueryResult> {
        self.read_memory().run_query(query)
    }

    fn close(&self) -> Result<()> {
        let memory = self.write_memory();
        memory.close();
        let mut backend = self.lock_backend();
        backend.close()
    }
}

fn begin(backend: &mut dyn Backend) -> Result<Box<dyn StoreTx + '_>> {
    backend
        .begin()
        .map_err(|e| GraphError::Storage(format!("failed to begin transaction: {e}")))
}

fn commit(tx: Box<dyn StoreTx + '_>) -> Result<()> {
    tx.commit()
        .map_err(|e| GraphError::Storage(format!("failed to commit transaction: {e}")))
}

fn persist_node_save(backend: &mut dyn Backend, node: &Node) -> Result<()> {
    let mut tx = begin(backend)?;
    if let Err(e) = tx.save_node(node) {
        let _ = tx.rollback();
        return Err(GraphError::Storage(format!("failed to persist node: {e}")));
    }
    commit(tx)
}

/// Deletes a node key and, in the same transaction, every incident edge
/// key removed by the in-memory cascade.
fn persist_node_delete(backend: &mut dyn Backend, id: &str, cascade: &[Edge]) -> Result<()> {
    let mut tx = begin(backend)?;
    let applied: Result<()> = (|| {
        tx.delete_node(id)?;
        for edge in cascade {
            tx.delete_edge(&edge.from, &edge.to, &edge.label)?;
        }
        Ok(())
    })();
    if let Err(e) = applied {
        let _ = tx.rollback();
        return Err(GraphError::Storage(format!(
            "failed to persist node deletion: {e}"
        )));
    }
    commit(tx)
}

fn persist_edge_save(backend: &mut dyn Backend, edge: &Edge) -> Result<()> {
    let mut tx = begin(backend)?;
    if let Err(e) = tx.save_edge(edge) {
        let _ = tx.rollback();
        return Err(GraphError::Storage(format!("failed to persist edge: {e}")));
    }
    commit(tx)
}

fn persist_edge_delete(backend: &mut dyn Backend, from: &str, to: &str, label: &str) -> Result<()> {
    let mut tx = begin(backend)?;
    if let Err(e) = tx.delete_edge(from, to, label) {
        let _ = tx.rollback();
        return Err(GraphError::Storage(format!(
            "failed to persist edge deletion: {e}"
        )));
    }
    commit(tx)
}

/// Re-inserts a removed node and its cascaded edges after a storage
/// failure. Compensation operates on captured pre-state, so failures here
/// indicate a bug; they are logged rather than propagated.
fn restore_node(memory: &MemoryGraph, node: Node, edges: Vec<Edge>) {
    let id = node.id.clone();
    if let Err(e) = memory.add_node(node) {
        error!("failed to undo in-memory delete of node '{id}': {e}");
        return;
    }
    for edge in edges {
        let (from, to, label) = (edge.from.clone(), edge.to.clone(), edge.label.clone());
        if let Err(e) = memory.add_edge(edge) {
            error!("failed to restore edge '{from}' -> '{to}' [{label}]: {e}");
        }
    }
}

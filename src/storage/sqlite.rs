use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::errors::{GraphError, Result};
use crate::graph::MemoryGraph;
use crate::types::{Edge, Node};

use super::{Backend, StoreStats, StoreTx};

/// The embedded schema applied when opening a store.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// On-disk format tag stored under `meta.version`. A store carrying any
/// other value is refused rather than migrated.
const FORMAT_VERSION: &str = "1.0";

/// Counters blob stored under `meta.stats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StatsBlob {
    #[serde(default)]
    last_saved: i64,
    #[serde(default)]
    last_loaded: i64,
}

/// Returns the current UNIX timestamp in seconds.
fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Builds the edges keyspace key for an edge identity.
///
/// Each component is length-prefixed, so ids and labels containing `:`
/// (e.g. `user:alice`) can never collide with a different triple.
pub(crate) fn edge_key(from: &str, to: &str, label: &str) -> String {
    format!(
        "{}:{}{}:{}{}:{}",
        from.len(),
        from,
        to.len(),
        to,
        label.len(),
        label
    )
}

/// SQLite-backed key-value store with the three keyspaces modeled as
/// plain `(key, value)` tables and JSON document values.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Option<Connection>,
}

impl SqliteBackend {
    /// Creates or opens a store at `path`, creating parent directories if
    /// needed.
    ///
    /// The connection runs in exclusive locking mode with a 5 second busy
    /// timeout: the schema write below acquires the file lock, so a second
    /// process opening the same path fails fast instead of corrupting the
    /// store. A store written by an unknown format version is refused.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    GraphError::Storage(format!("failed to create database directory: {e}"))
                })?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| GraphError::Storage(format!("failed to open database: {e}")))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA locking_mode = EXCLUSIVE;",
        )
        .map_err(|e| GraphError::Storage(format!("failed to apply pragmas: {e}")))?;

        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| GraphError::Storage(format!("failed to apply schema: {e}")))?;

        let existing: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
                row.get(0)
            })
            .optional()?;
        match existing {
            None => {
                conn.execute(
                    "INSERT INTO meta (key, value) VALUES ('version', ?1)",
                    params![FORMAT_VERSION],
                )?;
            }
            Some(version) if version == FORMAT_VERSION => {}
            Some(version) => return Err(GraphError::UnsupportedVersion(version)),
        }

        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut Connection> {
        self.conn
            .as_mut()
            .ok_or_else(|| GraphError::Storage("database is closed".to_string()))
    }
}

impl Backend for SqliteBackend {
    fn begin(&mut self) -> Result<Box<dyn StoreTx + '_>> {
        let tx = self.conn()?.transaction()?;
        Ok(Box::new(SqliteTx { tx }))
    }

    fn load_graph(&mut self) -> Result<MemoryGraph> {
        let graph = MemoryGraph::new();
        let conn = self.conn()?;

        {
            let mut stmt = conn.prepare("SELECT key, value FROM nodes")?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let key: String = row.get(0)?;
                let value: String = row.get(1)?;
                let node: Node = serde_json::from_str(&value).map_err(|e| {
                    GraphError::Storage(format!("failed to deserialize node '{key}': {e}"))
                })?;
                graph.add_node(node).map_err(|e| {
                    GraphError::Storage(format!("failed to replay node '{key}': {e}"))
                })?;
            }
        }

        {
            let mut stmt = conn.prepare("SELECT key, value FROM edges")?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let key: String = row.get(0)?;
                let value: String = row.get(1)?;
                let edge: Edge = serde_json::from_str(&value).map_err(|e| {
                    GraphError::Storage(format!("failed to deserialize edge '{key}': {e}"))
                })?;
                graph.add_edge(edge).map_err(|e| {
                    GraphError::Storage(format!("failed to replay edge '{key}': {e}"))
                })?;
            }
        }

        let mut blob = read_stats_blob(conn)?;
        blob.last_loaded = current_timestamp();
        write_stats_blob(conn, &blob)?;

        Ok(graph)
    }

    fn save_graph(&mut self, graph: &MemoryGraph) -> Result<()> {
        let nodes = graph.nodes()?;
        let edges = graph.edges()?;

        let tx = self.conn()?.transaction()?;
        tx.execute("DELETE FROM nodes", [])?;
        tx.execute("DELETE FROM edges", [])?;
        for node in &nodes {
            tx.execute(
                "INSERT INTO nodes (key, value) VALUES (?1, ?2)",
                params![node.id, serde_json::to_string(node)?],
            )?;
        }
        for edge in &edges {
            tx.execute(
                "INSERT INTO edges (key, value) VALUES (?1, ?2)",
                params![
                    edge_key(&edge.from, &edge.to, &edge.label),
                    serde_json::to_string(edge)?
                ],
            )?;
        }

        let mut blob = read_stats_blob(&tx)?;
        blob.last_saved = current_timestamp();
        write_stats_blob(&tx, &blob)?;

        tx.commit()?;
        Ok(())
    }

    fn stats(&mut self) -> Result<StoreStats> {
        let conn = self.conn()?;

        let database_size: i64 = conn.query_row(
            "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
            [],
            |row| row.get(0),
        )?;
        let node_count: i64 = conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        let edge_count: i64 = conn.query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        let blob = read_stats_blob(conn)?;

        Ok(StoreStats {
            database_size: database_size.max(0) as u64,
            node_count: node_count.max(0) as u64,
            edge_count: edge_count.max(0) as u64,
            last_saved: blob.last_saved,
            last_loaded: blob.last_loaded,
        })
    }

    fn close(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| e.into()),
            None => Ok(()),
        }
    }
}

/// Atomic SQLite transaction; dropped uncommitted, it rolls back.
struct SqliteTx<'c> {
    tx: rusqlite::Transaction<'c>,
}

impl StoreTx for SqliteTx<'_> {
    fn save_node(&mut self, node: &Node) -> Result<()> {
        self.tx.execute(
            "INSERT OR REPLACE INTO nodes (key, value) VALUES (?1, ?2)",
            params![node.id, serde_json::to_string(node)?],
        )?;
        Ok(())
    }

    fn delete_node(&mut self, id: &str) -> Result<()> {
        self.tx
            .execute("DELETE FROM nodes WHERE key = ?1", params![id])?;
        Ok(())
    }

    fn save_edge(&mut self, edge: &Edge) -> Result<()> {
        self.tx.execute(
            "INSERT OR REPLACE INTO edges (key, value) VALUES (?1, ?2)",
            params![
                edge_key(&edge.from, &edge.to, &edge.label),
                serde_json::to_string(edge)?
            ],
        )?;
        Ok(())
    }

    fn delete_edge(&mut self, from: &str, to: &str, label: &str) -> Result<()> {
        self.tx.execute(
            "DELETE FROM edges WHERE key = ?1",
            params![edge_key(from, to, label)],
        )?;
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let mut blob = read_stats_blob(&self.tx)?;
        blob.last_saved = current_timestamp();
        write_stats_blob(&self.tx, &blob)?;
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }
}

fn read_stats_blob(conn: &Connection) -> Result<StatsBlob> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM meta WHERE key = 'stats'", [], |row| {
            row.get(0)
        })
        .optional()?;
    // The counters blob is advisory; an unreadable one resets to zero.
    Ok(raw
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default())
}

fn write_stats_blob(conn: &Connection, blob: &StatsBlob) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES ('stats', ?1)",
        params![serde_json::to_string(blob)?],
    )?;
    Ok(())
}

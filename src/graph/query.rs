use std::collections::{HashMap, VecDeque};

use crate::errors::{GraphError, Result};
use crate::types::{Node, Path, Query, QueryResult};

use super::memory::{GraphInner, MemoryGraph};

/// Depth used by path queries when the caller does not specify one.
pub const DEFAULT_MAX_DEPTH: usize = 4;

/// Hard ceiling on path query depth; deeper requests are rejected.
pub const MAX_PATH_DEPTH: usize = 10;

impl MemoryGraph {
    /// Executes a query against a single consistent snapshot of the graph:
    /// the read hold is acquired once and kept for the whole evaluation.
    pub fn run_query(&self, query: &Query) -> Result<QueryResult> {
        let inner = self.read();
        inner.guard_open()?;

        match query {
            Query::Neighbors {
                node,
                direction,
                label,
            } => Ok(QueryResult {
                nodes: inner.neighbors_of(node, *direction, label.as_deref())?,
                ..Default::default()
            }),
            Query::Paths {
                from,
                to,
                max_depth,
            } => Ok(QueryResult {
                paths: inner.find_paths(from, to, *max_depth)?,
                ..Default::default()
            }),
            Query::Find { filters } => Ok(QueryResult {
                nodes: inner.find_nodes(filters)?,
                ..Default::default()
            }),
        }
    }
}

impl GraphInner {
    /// All simple directed paths from `from` to `to` with at most
    /// `max_depth` edges, breadth-first.
    ///
    /// A depth of 0 falls back to [`DEFAULT_MAX_DEPTH`]; anything above
    /// [`MAX_PATH_DEPTH`] is rejected. A self-query yields the single
    /// zero-length path.
    fn find_paths(&self, from: &str, to: &str, max_depth: usize) -> Result<Vec<Path>> {
        let depth = if max_depth == 0 {
            DEFAULT_MAX_DEPTH
        } else {
            max_depth
        };
        if depth > MAX_PATH_DEPTH {
            return Err(GraphError::MaxDepthExceeded);
        }

        let start = self.node_or_err(from)?;
        self.node_or_err(to)?;

        if from == to {
            return Ok(vec![Path {
                nodes: vec![start.clone()],
                edges: Vec::new(),
            }]);
        }

        let mut paths = Vec::new();
        let mut queue: VecDeque<Vec<String>> = VecDeque::new();
        queue.push_back(vec![from.to_string()]);

        while let Some(trail) = queue.pop_front() {
            // trail holds one more node than traversed edges
            if trail.len() - 1 >= depth {
                continue;
            }
            let Some(current) = trail.last() else {
                continue;
            };

            for next in self.out_neighbor_ids(current) {
                // Simple paths only: never revisit a node on the trail.
                if trail.iter().any(|id| id.as_str() == next) {
                    continue;
                }
                if next == to {
                    paths.push(self.materialize_path(&trail, next)?);
                } else {
                    let mut extended = trail.clone();
                    extended.push(next.to_string());
                    queue.push_back(extended);
                }
            }
        }

        Ok(paths)
    }

    /// Resolves a trail of node ids plus the final hop into a full path
    /// with node snapshots and one connecting edge per hop.
    fn materialize_path(&self, trail: &[String], last: &str) -> Result<Path> {
        let mut nodes: Vec<Node> = Vec::with_capacity(trail.len() + 1);
        for id in trail {
            nodes.push(self.node_or_err(id)?.clone());
        }
        nodes.push(self.node_or_err(last)?.clone());

        let mut edges = Vec::with_capacity(nodes.len() - 1);
        for pair in nodes.windows(2) {
            let edge = self.connecting_edge(&pair[0].id, &pair[1].id).ok_or_else(|| {
                GraphError::EdgeNotFound {
                    from: pair[0].id.clone(),
                    to: pair[1].id.clone(),
                    label: String::new(),
                }
            })?;
            edges.push(edge.clone());
        }

        Ok(Path { nodes, edges })
    }

    /// Nodes matching every filter. The `type` key anchors the candidate
    /// set on the type index; a full scan is intentionally not offered.
    fn find_nodes(&self, filters: &HashMap<String, String>) -> Result<Vec<Node>> {
        if filters.is_empty() {
            return Err(GraphError::InvalidArgument(
                "at least one filter (type or props) is required".to_string(),
            ));
        }
        let Some(node_type) = filters.get("type") else {
            return Err(GraphError::UnsupportedFind);
        };

        let matched = self
            .nodes_of_type(node_type)
            .into_iter()
            .filter(|node| {
                filters
                    .iter()
                    .all(|(key, value)| key == "type" || node.props.get(key) == Some(value))
            })
            .collect();

        Ok(matched)
    }
}

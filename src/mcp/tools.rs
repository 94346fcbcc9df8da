//! Tool catalog and per-tool adapters.
//!
//! Each adapter extracts and coerces arguments, invokes the graph, and
//! formats a human-readable text block. Tool failures (bad arguments or
//! graph errors) become results flagged with `isError`, never JSON-RPC
//! protocol errors; the success text templates are part of the external
//! contract.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::{GraphError, Result};
use crate::graph::{Graph, DEFAULT_MAX_DEPTH, MAX_PATH_DEPTH};
use crate::types::{Direction, Edge, Node, Query};

/// A tool definition exposed by the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// One block of tool output; currently always text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl ContentItem {
    /// Creates a text content block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_string(),
            text: text.into(),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Body of a `tools/call` result. Failures carry `isError: true`;
/// successes omit the flag entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResponse {
    pub content: Vec<ContentItem>,
    #[serde(rename = "isError", default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl CallToolResponse {
    fn text(text: String) -> Self {
        Self {
            content: vec![ContentItem::text(text)],
            is_error: false,
        }
    }

    fn error(message: String) -> Self {
        Self {
            content: vec![ContentItem::text(message)],
            is_error: true,
        }
    }
}

/// Returns the static seven-tool catalog.
pub fn tool_catalog() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "add_node".to_string(),
            description: "Add a node to the graph with ID, optional type, and properties"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "string",
                        "description": "Unique identifier for the node"
                    },
                    "type": {
                        "type": "string",
                        "description": "Optional type of the node (e.g., 'file', 'function', 'module')"
                    },
                    "props": {
                        "type": "object",
                        "description": "Optional key/value properties for the node",
                        "additionalProperties": { "type": "string" }
                    }
                },
                "required": ["id"]
            }),
        },
        ToolDefinition {
            name: "add_edge".to_string(),
            description: "Add a directed, labeled edge between two nodes".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "from": {
                        "type": "string",
                        "description": "Source node ID"
                    },
                    "to": {
                        "type": "string",
                        "description": "Target node ID"
                    },
                    "label": {
                        "type": "string",
                        "description": "Edge label/relationship type"
                    },
                    "props": {
                        "type": "object",
                        "description": "Optional key/value properties for the edge",
                        "additionalProperties": { "type": "string" }
                    }
                },
                "required": ["from", "to", "label"]
            }),
        },
        ToolDefinition {
            name: "delete_node".to_string(),
            description: "Delete a node from the graph (and all connected edges)".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "string",
                        "description": "ID of the node to delete"
                    }
                },
                "required": ["id"]
            }),
        },
        ToolDefinition {
            name: "delete_edge".to_string(),
            description: "Delete a specific edge from the graph".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "from": {
                        "type": "string",
                        "description": "Source node ID"
                    },
                    "to": {
                        "type": "string",
                        "description": "Target node ID"
                    },
                    "label": {
                        "type": "string",
                        "description": "Edge label/relationship type"
                    }
                },
                "required": ["from", "to", "label"]
            }),
        },
        ToolDefinition {
            name: "query_neighbors".to_string(),
            description: "Find neighboring nodes connected to a specific node".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "node": {
                        "type": "string",
                        "description": "Node ID to find neighbors for"
                    },
                    "direction": {
                        "type": "string",
                        "description": "Direction of edges to follow: 'in', 'out', or 'both'",
                        "enum": ["in", "out", "both"]
                    },
                    "label": {
                        "type": "string",
                        "description": "Optional edge label filter"
                    }
                },
                "required": ["node"]
            }),
        },
        ToolDefinition {
            name: "query_paths".to_string(),
            description: "Find paths between two nodes in the graph".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "from": {
                        "type": "string",
                        "description": "Starting node ID"
                    },
                    "to": {
                        "type": "string",
                        "description": "Target node ID"
                    },
                    "max_depth": {
                        "type": "integer",
                        "description": "Maximum path depth to search (default: 4)",
                        "minimum": 1,
                        "maximum": 10
                    }
                },
                "required": ["from", "to"]
            }),
        },
        ToolDefinition {
            name: "query_find".to_string(),
            description: "Find nodes matching specific criteria (type and/or properties)"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "type": {
                        "type": "string",
                        "description": "Node type to search for"
                    },
                    "props": {
                        "type": "object",
                        "description": "Key/value properties to match",
                        "additionalProperties": { "type": "string" }
                    }
                }
            }),
        },
    ]
}

/// Dispatches a tool call, converting any failure into a tool-error
/// result (`isError: true`) rather than letting it escape.
pub fn dispatch_tool(graph: &dyn Graph, name: &str, args: &Value) -> CallToolResponse {
    match execute_tool(graph, name, args) {
        Ok(response) => response,
        Err(e) => CallToolResponse::error(format!("Error: {e}")),
    }
}

fn execute_tool(graph: &dyn Graph, name: &str, args: &Value) -> Result<CallToolResponse> {
    match name {
        "add_node" => run_add_node(graph, args),
        "add_edge" => run_add_edge(graph, args),
        "delete_node" => run_delete_node(graph, args),
        "delete_edge" => run_delete_edge(graph, args),
        "query_neighbors" => run_query_neighbors(graph, args),
        "query_paths" => run_query_paths(graph, args),
        "query_find" => run_query_find(graph, args),
        _ => Err(GraphError::InvalidArgument(format!("unknown tool: {name}"))),
    }
}

// ---------------------------------------------------------------------------
// Argument coercion
// ---------------------------------------------------------------------------

/// Extracts a required argument that must be a non-empty string.
fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    match args.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        _ => Err(GraphError::InvalidArgument(format!(
            "{key} is required and must be a string"
        ))),
    }
}

/// Extracts an optional string argument; a present non-string is rejected,
/// an empty string counts as absent.
fn optional_str<'a>(args: &'a Value, key: &str) -> Result<Option<&'a str>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(GraphError::InvalidArgument(format!(
            "{key} must be a string"
        ))),
    }
}

/// Extracts a props object, keeping string values verbatim and silently
/// discarding everything else.
fn props_arg(args: &Value, key: &str) -> HashMap<String, String> {
    let mut props = HashMap::new();
    if let Some(Value::Object(map)) = args.get(key) {
        for (k, v) in map {
            if let Value::String(s) = v {
                props.insert(k.clone(), s.clone());
            }
        }
    }
    props
}

/// Extracts `max_depth`: absent selects the default, anything present must
/// be an integral number within `[1, MAX_PATH_DEPTH]`.
fn max_depth_arg(args: &Value) -> Result<usize> {
    match args.get("max_depth") {
        None | Some(Value::Null) => Ok(DEFAULT_MAX_DEPTH),
        Some(value) => {
            let depth = match (value.as_i64(), value.as_f64()) {
                (Some(depth), _) => depth,
                // Integral floats (e.g. 4.0) coerce; fractional ones do not.
                (None, Some(f)) if f.fract() == 0.0 => f as i64,
                _ => {
                    return Err(GraphError::InvalidArgument(
                        "max_depth must be an integer".to_string(),
                    ))
                }
            };
            if depth < 1 || depth as usize > MAX_PATH_DEPTH {
                return Err(GraphError::InvalidArgument(format!(
                    "max_depth must be between 1 and {MAX_PATH_DEPTH}"
                )));
            }
            Ok(depth as usize)
        }
    }
}

// ---------------------------------------------------------------------------
// Tool adapters
// ---------------------------------------------------------------------------

fn run_add_node(graph: &dyn Graph, args: &Value) -> Result<CallToolResponse> {
    let id = required_str(args, "id")?;
    let node_type = optional_str(args, "type")?.unwrap_or_default();
    let props = props_arg(args, "props");

    graph.add_node(Node {
        id: id.to_string(),
        node_type: node_type.to_string(),
        props,
    })?;

    Ok(CallToolResponse::text(format!(
        "Successfully added node '{id}' with type '{node_type}'"
    )))
}

fn run_add_edge(graph: &dyn Graph, args: &Value) -> Result<CallToolResponse> {
    let from = required_str(args, "from")?;
    let to = required_str(args, "to")?;
    let label = required_str(args, "label")?;
    let props = props_arg(args, "props");

    graph.add_edge(Edge {
        from: from.to_string(),
        to: to.to_string(),
        label: label.to_string(),
        props,
    })?;

    Ok(CallToolResponse::text(format!(
        "Successfully added edge '{from}' -> '{to}' with label '{label}'"
    )))
}

fn run_delete_node(graph: &dyn Graph, args: &Value) -> Result<CallToolResponse> {
    let id = required_str(args, "id")?;
    graph.delete_node(id)?;

    Ok(CallToolResponse::text(format!(
        "Successfully deleted node '{id}'"
    )))
}

fn run_delete_edge(graph: &dyn Graph, args: &Value) -> Result<CallToolResponse> {
    let from = required_str(args, "from")?;
    let to = required_str(args, "to")?;
    let label = required_str(args, "label")?;
    graph.delete_edge(from, to, label)?;

    Ok(CallToolResponse::text(format!(
        "Successfully deleted edge '{from}' -> '{to}' with label '{label}'"
    )))
}

fn run_query_neighbors(graph: &dyn Graph, args: &Value) -> Result<CallToolResponse> {
    let node = required_str(args, "node")?;
    let direction = match optional_str(args, "direction")? {
        Some(s) => Direction::parse(s)?,
        None => Direction::Both,
    };
    let label = optional_str(args, "label")?.map(str::to_string);

    let result = graph.query(&Query::Neighbors {
        node: node.to_string(),
        direction,
        label,
    })?;

    let mut text = format!(
        "Found {} neighbors for node '{}':\n",
        result.nodes.len(),
        node
    );
    for n in &result.nodes {
        text.push_str(&format!("- {} (type: {})\n", n.id, n.node_type));
    }

    Ok(CallToolResponse::text(text))
}

fn run_query_paths(graph: &dyn Graph, args: &Value) -> Result<CallToolResponse> {
    let from = required_str(args, "from")?;
    let to = required_str(args, "to")?;
    let max_depth = max_depth_arg(args)?;

    let result = graph.query(&Query::Paths {
        from: from.to_string(),
        to: to.to_string(),
        max_depth,
    })?;

    let mut text = format!(
        "Found {} paths from '{}' to '{}':\n",
        result.paths.len(),
        from,
        to
    );
    for (i, path) in result.paths.iter().enumerate() {
        text.push_str(&format!("Path {}: ", i + 1));
        for (j, node) in path.nodes.iter().enumerate() {
            if j > 0 {
                text.push_str(" -> ");
            }
            text.push_str(&node.id);
        }
        text.push('\n');
    }

    Ok(CallToolResponse::text(text))
}

fn run_query_find(graph: &dyn Graph, args: &Value) -> Result<CallToolResponse> {
    let node_type = optional_str(args, "type")?;
    let mut filters = props_arg(args, "props");
    if let Some(ty) = node_type {
        filters.insert("type".to_string(), ty.to_string());
    }
    if filters.is_empty() {
        return Err(GraphError::InvalidArgument(
            "at least one filter (type or props) is required".to_string(),
        ));
    }

    let result = graph.query(&Query::Find { filters })?;

    let mut text = format!("Found {} nodes matching criteria:\n", result.nodes.len());
    for n in &result.nodes {
        text.push_str(&format!("- {} (type: {})", n.id, n.node_type));
        if !n.props.is_empty() {
            // Sorted for stable output.
            let sorted: BTreeMap<&String, &String> = n.props.iter().collect();
            let rendered: Vec<String> =
                sorted.iter().map(|(k, v)| format!("{k}: {v}")).collect();
            text.push_str(&format!(" {{{}}}", rendered.join(", ")));
        }
        text.push('\n');
    }

    Ok(CallToolResponse::text(text))
}

//! The MCP server: reads JSON-RPC 2.0 messages line by line from stdin
//! and writes one response per request to stdout.
//!
//! Diagnostics go to stderr via `tracing`; stdout carries nothing but
//! responses. The server holds one piece of state: whether `initialize`
//! has been received. Tool calls are routed to the adapters in
//! [`super::tools`]; their failures come back as tool-error results, not
//! protocol errors.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error};

use crate::errors::Result;
use crate::graph::Graph;

use super::tools::{dispatch_tool, tool_catalog};
use super::transport::{ErrorCode, JsonRpcRequest, JsonRpcResponse};

/// Protocol revision implemented by this server.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Parameters of the `initialize` request. All fields are optional on the
/// wire; unknown capabilities are accepted and ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct InitializeParams {
    protocol_version: String,
    #[allow(dead_code)]
    capabilities: Value,
    client_info: ClientInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClientInfo {
    name: String,
    version: String,
}

/// Stateful JSON-RPC dispatcher over a graph.
pub struct McpServer {
    graph: Arc<dyn Graph>,
    initialized: bool,
}

impl McpServer {
    /// Creates a server over the given graph, not yet initialized.
    pub fn new(graph: Arc<dyn Graph>) -> Self {
        Self {
            graph,
            initialized: false,
        }
    }

    /// Runs the request loop until stdin closes or a shutdown signal
    /// arrives. The current request is always answered before returning.
    pub async fn run(&mut self) -> Result<()> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(stdin).lines();

        debug!("MCP server started");

        loop {
            let line = tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!("transport read failed: {e}");
                        return Err(e.into());
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    debug!("shutdown signal received, stopping server");
                    break;
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            debug!("received request: {line}");

            if let Some(response) = self.handle_line(line) {
                let mut payload = serde_json::to_string(&response)?;
                payload.push('\n');
                stdout.write_all(payload.as_bytes()).await?;
                stdout.flush().await?;
            }
        }

        debug!("MCP server finished");
        Ok(())
    }

    /// Processes one input line; returns `None` for notifications.
    pub fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    ErrorCode::ParseError,
                    format!("failed to parse JSON-RPC request: {e}"),
                ))
            }
        };
        self.handle_request(&request)
    }

    fn handle_request(&mut self, request: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone();

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(id, &request.params)),
            // Client-side notifications; no response required.
            "initialized" | "notifications/initialized" => None,
            "ping" => Some(JsonRpcResponse::success(id, json!({}))),
            "tools/list" => Some(self.handle_tools_list(id)),
            "tools/call" => Some(self.handle_tools_call(id, &request.params)),
            other => Some(JsonRpcResponse::error(
                id,
                ErrorCode::MethodNotFound,
                format!("method not found: {other}"),
            )),
        }
    }

    /// Handles `initialize`. Idempotent: re-sending it is accepted and
    /// resets nothing besides confirming the handshake.
    fn handle_initialize(&mut self, id: Value, params: &Option<Value>) -> JsonRpcResponse {
        let init: InitializeParams = match params {
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(init) => init,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        ErrorCode::InvalidParams,
                        format!("invalid initialize params: {e}"),
                    )
                }
            },
            None => InitializeParams::default(),
        };

        debug!(
            "initialize: protocol={}, client={} {}",
            init.protocol_version, init.client_info.name, init.client_info.version
        );

        self.initialized = true;

        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {
                        "listChanged": false
                    }
                },
                "serverInfo": {
                    "name": "relgraph",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        if !self.initialized {
            return JsonRpcResponse::error(id, ErrorCode::InvalidRequest, "server not initialized");
        }

        JsonRpcResponse::success(id, json!({ "tools": tool_catalog() }))
    }

    fn handle_tools_call(&self, id: Value, params: &Option<Value>) -> JsonRpcResponse {
        if !self.initialized {
            return JsonRpcResponse::error(id, ErrorCode::InvalidRequest, "server not initialized");
        }

        let params = match params {
            Some(params) => params,
            None => {
                return JsonRpcResponse::error(
                    id,
                    ErrorCode::InvalidParams,
                    "missing params for tools/call",
                )
            }
        };

        let name = match params.get("name").and_then(Value::as_str) {
            Some(name) => name,
            None => {
                return JsonRpcResponse::error(
                    id,
                    ErrorCode::InvalidParams,
                    "missing 'name' in tools/call params",
                )
            }
        };

        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let response = dispatch_tool(self.graph.as_ref(), name, &arguments);
        match serde_json::to_value(&response) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::error(
                id,
                ErrorCode::InternalError,
                format!("failed to encode tool result: {e}"),
            ),
        }
    }
}

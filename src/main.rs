use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use relgraph::errors::{GraphError, Result};
use relgraph::graph::{Graph, MemoryGraph};
use relgraph::mcp::McpServer;
use relgraph::storage::{Backend, PersistentGraph, SqliteBackend};
use relgraph::types::{Edge, Node};

/// Local labeled multi-graph database served as an MCP tool server.
///
/// Speaks JSON-RPC 2.0 over stdio: one request per line on stdin, one
/// response per line on stdout. Diagnostics go to stderr.
#[derive(Parser)]
#[command(name = "relgraph", version, about)]
struct Cli {
    /// Enable debug logging to stderr
    #[arg(long)]
    debug: bool,

    /// Database file path (omit to run fully in memory)
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Pretty-print the contents of a database file and exit
    #[arg(long, value_name = "PATH", conflicts_with = "db")]
    dump: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "relgraph=debug" } else { "relgraph=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Responses own stdout; everything diagnostic goes to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(path) = &cli.dump {
        return dump_database(path);
    }

    let graph: Arc<dyn Graph> = match &cli.db {
        Some(path) => {
            let backend = SqliteBackend::open(path)?;
            let persistent = PersistentGraph::new(Box::new(backend));
            if let Err(e) = persistent.load() {
                warn!("starting with an empty graph: {e}");
            }
            info!("using persistent graph storage at {}", path.display());
            Arc::new(persistent)
        }
        None => {
            info!("using in-memory graph storage");
            Arc::new(MemoryGraph::new())
        }
    };

    let mut server = McpServer::new(graph.clone());
    let served = server.run().await;

    if let Err(e) = graph.close() {
        warn!("failed to close graph: {e}");
    }
    served
}

/// Loads a database file and pretty-prints its contents.
fn dump_database(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(GraphError::Storage(format!(
            "database file does not exist: {}",
            path.display()
        )));
    }

    let mut backend = SqliteBackend::open(path)?;
    let graph = backend.load_graph()?;
    let nodes = graph.nodes()?;
    let edges = graph.edges()?;
    backend.close()?;

    println!("relgraph database contents: {}", path.display());
    println!("=====================================");
    println!();
    println!("Statistics:");
    println!("  Nodes: {}", nodes.len());
    println!("  Edges: {}", edges.len());

    let mut type_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for node in &nodes {
        let node_type = if node.node_type.is_empty() {
            "<no-type>"
        } else {
            node.node_type.as_str()
        };
        *type_counts.entry(node_type).or_default() += 1;
    }
    println!("  Types: {}", type_counts.len());
    println!();

    if !type_counts.is_empty() {
        println!("Node Types:");
        for (node_type, count) in &type_counts {
            println!("  {node_type}: {count} nodes");
        }
        println!();
    }

    if !nodes.is_empty() {
        println!("Nodes:");
        println!("------");
        for node in &nodes {
            print_node(node);
        }
        println!();
    }

    if !edges.is_empty() {
        println!("Edges:");
        println!("------");
        for edge in &edges {
            print_edge(edge);
        }
    }

    if nodes.is_empty() && edges.is_empty() {
        println!("Database is empty.");
    }

    Ok(())
}

fn print_node(node: &Node) {
    print!("Node: {}", node.id);
    if !node.node_type.is_empty() {
        print!(" (type: {})", node.node_type);
    }
    println!();
    print_properties(&node.props);
    println!();
}

fn print_edge(edge: &Edge) {
    println!("Edge: {} -> {} [{}]", edge.from, edge.to, edge.label);
    print_properties(&edge.props);
    println!();
}

fn print_properties(props: &HashMap<String, String>) {
    if props.is_empty() {
        return;
    }

    let sorted: BTreeMap<&String, &String> = props.iter().collect();
    println!("  Properties:");
    for (key, value) in sorted {
        // Long values are truncated for readability.
        if value.chars().count() > 100 {
            let prefix: String = value.chars().take(97).collect();
            println!("    {key}: {prefix}...");
        } else {
            println!("    {key}: {value}");
        }
    }
}

use thiserror::Error;

/// Errors that can occur during graph and storage operations.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("node ID cannot be empty")]
    EmptyNodeId,

    #[error("edge 'from' node cannot be empty")]
    EmptyFromNode,

    #[error("edge 'to' node cannot be empty")]
    EmptyToNode,

    #[error("edge label cannot be empty")]
    EmptyEdgeLabel,

    #[error("node not found: '{0}'")]
    NodeNotFound(String),

    #[error("node already exists: '{0}'")]
    NodeExists(String),

    #[error("edge not found: '{from}' -> '{to}' [{label}]")]
    EdgeNotFound {
        from: String,
        to: String,
        label: String,
    },

    #[error("edge already exists: '{from}' -> '{to}' [{label}]")]
    EdgeExists {
        from: String,
        to: String,
        label: String,
    },

    #[error("invalid direction '{0}': must be 'in', 'out', or 'both'")]
    InvalidDirection(String),

    #[error("maximum query depth exceeded")]
    MaxDepthExceeded,

    #[error("property-based search requires a 'type' filter")]
    UnsupportedFind,

    #[error("graph is closed")]
    GraphClosed,

    #[error("{0}")]
    InvalidArgument(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("unsupported database format version '{0}'")]
    UnsupportedVersion(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for results using `GraphError`.
pub type Result<T> = std::result::Result<T, GraphError>;

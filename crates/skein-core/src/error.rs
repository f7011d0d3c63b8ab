use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkeinError {
    // Graph construction errors
    #[error("Graph definition error: {0}")]
    GraphDefinition(String),

    // Execution errors
    #[error("Backend execution failed: {backend}: {message}")]
    BackendExecution { backend: String, message: String },

    #[error("Input shape mismatch: node {node} in {mode} mode requires an array payload")]
    InputShape { node: String, mode: String },

    #[error("Node {node} exceeded the visit limit of {limit} for this run")]
    VisitLimitExceeded { node: String, limit: usize },

    #[error("Worker task failed: {0}")]
    Worker(String),

    // Policy errors
    #[error("Condition evaluation failed: {0}")]
    Condition(String),

    #[error("Join strategy failed: {0}")]
    Join(String),

    #[error("Merge strategy failed: {0}")]
    Merge(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SkeinError {
    /// Shorthand for a failure raised by the named backend.
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendExecution {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Whether this error was raised while building or addressing the graph.
    pub fn is_graph_definition(&self) -> bool {
        matches!(self, Self::GraphDefinition(_))
    }
}

pub type Result<T> = std::result::Result<T, SkeinError>;

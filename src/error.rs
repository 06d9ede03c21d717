use std::time::Duration;
use thiserror::Error;

/// Main error type for Recipebot
#[derive(Error, Debug)]
pub enum RecipebotError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Graph store could not be reached or the socket dropped
    #[error("Graph connection error: {0}")]
    GraphConnection(String),

    /// Graph store rejected a traversal
    #[error("Graph error {code}: {message}")]
    Graph { code: u16, message: String },

    /// Traversal direction outside in/out/both
    #[error("Invalid direction '{0}'. Must be 'in', 'out', or 'both'.")]
    InvalidDirection(String),

    /// Traversal returned nothing where one element was expected
    #[error("Vertex not found: {0}")]
    VertexNotFound(String),

    /// Search service errors
    #[error("Search error: {0}")]
    Search(String),

    /// Chat completion API errors; `status` is the upstream HTTP status when there was one
    #[error("Completion API error: {message}")]
    Completion { status: Option<u16>, message: String },

    /// Outbound call exceeded its deadline
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    /// Parse errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RecipebotError {
    /// Upstream rejected the request itself (HTTP 400), as opposed to failing to serve it.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, RecipebotError::Completion { status: Some(400), .. })
    }

    pub(crate) fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        RecipebotError::Timeout {
            operation: operation.into(),
            after,
        }
    }
}

/// Convenient Result type using RecipebotError
pub type Result<T> = std::result::Result<T, RecipebotError>;

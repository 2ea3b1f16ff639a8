use std::time::Duration;
use thiserror::Error;

/// Tool RPC errors
#[derive(Error, Debug)]
pub enum McpError {
    /// Stream could not be opened, was lost, or the client is not connected
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Error envelope from the server, or a rejected POST
    #[error("{message}")]
    Protocol { code: i64, message: String },

    #[error("Request {method} timed out after {after:?}")]
    Timeout { method: String, after: Duration },

    /// Client disconnected while the request was pending
    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    pub fn connection(reason: impl Into<String>) -> Self {
        McpError::Connection(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, McpError>;

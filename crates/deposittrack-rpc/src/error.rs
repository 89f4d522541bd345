//! Transport-level error types.

use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors that can occur during an RPC lookup.
#[derive(Debug, Error)]
pub enum RpcError {
    /// HTTP request failed (connection refused, timeout, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON-RPC protocol-level error returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The node returned null where a value was required (e.g. unknown
    /// block or receipt).
    #[error("Missing result: {what}")]
    MissingResult { what: String },

    /// A required field was absent or malformed in the response.
    #[error("Malformed response: missing {field}")]
    MalformedResponse { field: String },
}

impl RpcError {
    /// Returns `true` if the error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

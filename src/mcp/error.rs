//! MCP error types

use rmcp::service::ClientInitializeError;
use rmcp::ServiceError;
use thiserror::Error;

/// Context rmcp attaches when the very first message cannot be delivered.
const INITIALIZE_SEND_CONTEXT: &str = "send initialize request";

/// Errors raised by the MCP client and the session layer.
#[derive(Debug, Error)]
pub enum McpError {
    /// The server could not be reached or the stream could not be opened.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The `initialize` exchange failed.
    #[error("MCP handshake failed: {0}")]
    Initialize(#[from] ClientInitializeError),

    /// A request on a running session failed (JSON-RPC error, closed
    /// transport, unexpected response, ...).
    #[error("MCP request failed: {0}")]
    Service(#[from] ServiceError),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// The server violated the protocol (bad version, ...).
    #[error("MCP protocol error: {0}")]
    Protocol(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl McpError {
    /// True when the failure happened before any MCP exchange could take
    /// place (refused connection, DNS failure, bad URL).
    pub fn is_connection_failure(&self) -> bool {
        match self {
            McpError::ConnectionError(_) => true,
            McpError::Initialize(ClientInitializeError::TransportError { context, .. }) => {
                context.as_ref() == INITIALIZE_SEND_CONTEXT
            }
            _ => false,
        }
    }
}

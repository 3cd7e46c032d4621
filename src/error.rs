use crate::mcp::McpError;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "config.mcp.url", "response.content[1]")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "mcp_session", "anthropic_driver")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Coarse failure category, stable across error variants.
///
/// Tool-call failures never show up here: the dispatcher turns them into tool
/// output text before they can reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The MCP server could not be reached or the stream could not be opened.
    Connection,
    /// The MCP `initialize` exchange failed.
    Handshake,
    /// `tools/list` failed or returned something unusable.
    CatalogRetrieval,
    /// A Messages API call failed (transport, HTTP status, or response shape).
    Completion,
    /// Invalid or missing configuration.
    Configuration,
}

/// Unified error type for the bridge.
#[derive(Debug, Error)]
pub enum Error {
    #[error("MCP connection failed: {source}{}", format_context(.context))]
    Connection {
        #[source]
        source: McpError,
        context: ErrorContext,
    },

    #[error("MCP handshake failed: {source}{}", format_context(.context))]
    Handshake {
        #[source]
        source: McpError,
        context: ErrorContext,
    },

    #[error("Tool catalog retrieval failed: {source}{}", format_context(.context))]
    Catalog {
        #[source]
        source: McpError,
        context: ErrorContext,
    },

    #[error("Completion request failed: {message}{}", format_context(.context))]
    Completion {
        message: String,
        context: ErrorContext,
    },

    #[error("Remote error: HTTP {status} ({class}): {message}")]
    Remote {
        status: u16,
        class: String,
        message: String,
        retryable: bool,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn connection(source: McpError) -> Self {
        Error::Connection {
            source,
            context: ErrorContext::new().with_source("mcp_session"),
        }
    }

    pub fn handshake(source: McpError) -> Self {
        Error::Handshake {
            source,
            context: ErrorContext::new().with_source("mcp_session"),
        }
    }

    pub fn catalog(source: McpError) -> Self {
        Error::Catalog {
            source,
            context: ErrorContext::new().with_source("mcp_session"),
        }
    }

    pub fn completion(msg: impl Into<String>) -> Self {
        Error::Completion {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a new completion error with structured context
    pub fn completion_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Completion {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Failure category. Transport, remote and serialization errors only arise
    /// from Messages API calls, so they classify as `Completion`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connection { .. } => ErrorKind::Connection,
            Error::Handshake { .. } => ErrorKind::Handshake,
            Error::Catalog { .. } => ErrorKind::CatalogRetrieval,
            Error::Completion { .. }
            | Error::Remote { .. }
            | Error::Transport(_)
            | Error::Serialization(_) => ErrorKind::Completion,
            Error::Configuration { .. } | Error::Io(_) => ErrorKind::Configuration,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Connection { context, .. }
            | Error::Handshake { context, .. }
            | Error::Catalog { context, .. }
            | Error::Completion { context, .. }
            | Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Whether the remote side reported a transient condition. Informational
    /// only: nothing in this crate retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Remote { retryable, .. } => *retryable,
            Error::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }
}

//! MCP 工具会话模块 — 连接 MCP 服务器、发现工具并执行工具调用
//!
//! MCP (Model Context Protocol) client side of the bridge. This module handles:
//! - MCP wire types (`tools/list` descriptors, `tools/call` results) and
//!   their conversion from the `rmcp` model
//! - Session lifecycle over `rmcp`: connect, handshake, catalog discovery,
//!   release ([`session`])
//! - Tool catalog → Messages API tool conversion ([`bridge`])
//! - Failure-contained tool dispatch ([`dispatcher`])

pub mod bridge;
pub mod dispatcher;
pub mod error;
pub mod session;

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Tool};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub use bridge::to_client_tools;
pub use dispatcher::{DispatchMode, ToolDispatcher};
pub use error::McpError;
pub use session::McpSession;

/// Revisions accepted in the server's `initialize` answer.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

/// An MCP tool as received from an MCP server's `tools/list` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTool {
    /// Tool name (MCP spec: must be unique within a server).
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// JSON Schema describing the tool's input parameters.
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Option<Value>,
}

/// An MCP tool invocation result (received from an MCP server).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolResult {
    /// Result content (may be text, image, or embedded resources).
    #[serde(default)]
    pub content: Vec<McpContent>,
    /// Whether the tool execution resulted in an error.
    #[serde(default, rename = "isError", alias = "is_error")]
    pub is_error: bool,
}

/// MCP content block within a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl McpContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".into(),
            text: Some(text.into()),
            extra: HashMap::new(),
        }
    }
}

impl From<Tool> for McpTool {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name.into_owned(),
            description: tool.description.map(|d| d.into_owned()),
            input_schema: Some(Value::Object(Arc::unwrap_or_clone(tool.input_schema))),
        }
    }
}

impl TryFrom<CallToolResult> for McpToolResult {
    type Error = serde_json::Error;

    /// Content items keep their wire shape. A result carrying only
    /// `structuredContent` is rendered as one JSON text item.
    fn try_from(result: CallToolResult) -> Result<Self, Self::Error> {
        let mut content = result
            .content
            .iter()
            .map(|item| serde_json::to_value(item).and_then(serde_json::from_value))
            .collect::<Result<Vec<McpContent>, _>>()?;
        if content.is_empty() {
            if let Some(structured) = result.structured_content {
                content.push(McpContent::text(structured.to_string()));
            }
        }
        Ok(Self {
            content,
            is_error: result.is_error.unwrap_or(false),
        })
    }
}

/// Transport type used to reach an MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McpTransportKind {
    /// `GET` event stream plus `POST` endpoint announced by the server.
    Sse,
    /// Single `POST` endpoint answering with JSON or an event stream.
    StreamableHttp,
}

/// MCP server connection descriptor used by the session manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpServerSpec {
    /// Human-readable server name (logging only).
    pub name: String,
    pub transport: McpTransportKind,
    /// SSE stream URL or Streamable HTTP endpoint.
    pub url: String,
    /// Timeout for opening the connection and completing the handshake.
    pub http_timeout_secs: u64,
    /// How long to wait for a `tools/list` or `tools/call` response.
    pub sse_read_timeout_secs: u64,
}

impl Default for McpServerSpec {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            transport: McpTransportKind::Sse,
            url: "http://localhost:8000/sse".to_string(),
            http_timeout_secs: 5,
            sse_read_timeout_secs: 300,
        }
    }
}

impl McpServerSpec {
    pub fn sse(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn streamable_http(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            transport: McpTransportKind::StreamableHttp,
            ..Self::default()
        }
    }
}

/// A live tool session as seen by the orchestrator.
///
/// The catalog is fixed when the session starts; `call_tool` is the only
/// remote operation the core performs afterwards.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Tools discovered at session start.
    fn catalog(&self) -> &[McpTool];

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<McpToolResult, McpError>;
}

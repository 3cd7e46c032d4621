//! # mcp-chat-bridge
//!
//! 把 Anthropic Messages API 与 MCP 工具服务器连接起来的对话桥接库。
//!
//! Chat bridge between the Anthropic Messages API and a Model Context
//! Protocol (MCP) tool server.
//!
//! ## Overview
//!
//! An [`McpSession`] connects to one MCP server (SSE or Streamable HTTP),
//! performs the handshake and caches the server's tool catalog. A
//! [`ChatOrchestrator`] then answers user messages: it offers the catalog to
//! the model as client tools, runs the tool calls the model asks for through
//! the session, and returns the model's final text.
//!
//! ## Error Model
//!
//! - Tool failures are contained: they become tool output text the model sees.
//! - Session start-up and completion failures propagate as [`Error`], with
//!   [`Error::kind`] telling connection, handshake, catalog retrieval,
//!   completion and configuration failures apart.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mcp_chat_bridge::{AnthropicClient, ChatOrchestrator, McpServerSpec, McpSession, Message};
//!
//! #[tokio::main]
//! async fn main() -> mcp_chat_bridge::Result<()> {
//!     let model = AnthropicClient::builder().build()?;
//!     let session = McpSession::start(&McpServerSpec::sse("http://localhost:8000/sse")).await?;
//!
//!     let orchestrator = ChatOrchestrator::new(&model, &session);
//!     let history = vec![Message::user("What's the weather in Tokyo?")];
//!     let reply = orchestrator.respond_with_defaults(&history).await?;
//!     println!("{}", reply);
//!
//!     session.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`mcp`] | MCP session (over `rmcp`), catalog adapter, tool dispatcher |
//! | [`orchestrator`] | One-message conversation flow |
//! | [`client`] | Anthropic Messages API client and builder |
//! | [`drivers`] | Messages API request/response model and wire driver |
//! | [`transport`] | HTTP transport for the Messages API |
//! | [`types`] | Messages, content blocks, tool types |
//! | [`config`] | Layered configuration |

pub mod client;
pub mod config;
pub mod drivers;
pub mod mcp;
pub mod orchestrator;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use client::{AnthropicClient, AnthropicClientBuilder};
pub use config::BridgeConfig;
pub use drivers::{MessagesApi, MessagesRequest, MessagesResponse, StopReason};
pub use mcp::{DispatchMode, McpServerSpec, McpSession, McpTransportKind, ToolSession};
pub use orchestrator::{ChatOrchestrator, TurnOutcome};
pub use types::{
    message::{ContentBlock, Message, MessageRole},
    tool::{ToolCall, ToolDefinition, ToolResult},
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ErrorKind};

//! # Types Module
//!
//! Strongly-typed representations of the Messages API primitives that flow
//! through the bridge: conversation messages, content blocks, and the tool
//! calling types.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Chat message with role and content |
//! | [`ContentBlock`] | Text, tool use, tool result, or pass-through block |
//! | [`ToolDefinition`] | Tool offered to the model |
//! | [`ToolCall`] | Tool invocation requested by the model |
//! | [`ToolResult`] | Outcome of one tool invocation |
//!
//! ## Example
//!
//! ```rust
//! use mcp_chat_bridge::types::{Message, ToolDefinition};
//!
//! let system = Message::system("You are a helpful assistant");
//! let user = Message::user("What's the weather?");
//!
//! let tool = ToolDefinition {
//!     name: "get_weather".to_string(),
//!     description: "Get current weather for a city".to_string(),
//!     input_schema: serde_json::json!({
//!         "type": "object",
//!         "properties": { "city": {"type": "string"} }
//!     }),
//! };
//! ```

pub mod message;
pub mod tool;

pub use message::{ContentBlock, Message, MessageContent, MessageRole};
pub use tool::{ToolCall, ToolDefinition, ToolResult};

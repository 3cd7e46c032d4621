//! Conversation message format used by the Messages API

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Unified message structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: MessageContent,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn with_content(role: MessageRole, content: MessageContent) -> Self {
        Self { role, content }
    }

    pub fn is_system(&self) -> bool {
        matches!(self.role, MessageRole::System)
    }

    /// Concatenated text of the message: the string itself, or every text
    /// block in order.
    pub fn text(&self) -> String {
        self.content.text()
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Message content (can be string or array of content blocks)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    pub fn blocks(blocks: Vec<ContentBlock>) -> Self {
        MessageContent::Blocks(blocks)
    }

    /// Block view; plain text content has no blocks.
    pub fn as_blocks(&self) -> &[ContentBlock] {
        match self {
            MessageContent::Text(_) => &[],
            MessageContent::Blocks(blocks) => blocks,
        }
    }

    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Blocks(blocks) => concat_text(blocks),
        }
    }
}

/// Content block of a message.
///
/// Block types this crate does not interpret (thinking, images, server tool
/// blocks, ...) are kept as raw JSON in [`ContentBlock::Other`], and unknown
/// fields of text and tool_use blocks (`citations`, `cache_control`, ...) in
/// `extra`, so that an assistant turn can be echoed back to the API unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text {
        text: String,
        extra: Map<String, Value>,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
        extra: Map<String, Value>,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
    Other(Value),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text {
            text: text.into(),
            extra: Map::new(),
        }
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
            extra: Map::new(),
        }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Wire `type` tag of this block.
    pub fn block_type(&self) -> &str {
        match self {
            ContentBlock::Text { .. } => "text",
            ContentBlock::ToolUse { .. } => "tool_use",
            ContentBlock::ToolResult { .. } => "tool_result",
            ContentBlock::Other(v) => v.get("type").and_then(Value::as_str).unwrap_or(""),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Concatenate the text of every text block, in order.
pub fn concat_text(blocks: &[ContentBlock]) -> String {
    blocks.iter().filter_map(ContentBlock::as_text).collect()
}

// Typed wire shape of the blocks we interpret. Kept private: the public enum
// adds the raw pass-through variant, which serde's tagged derive cannot express.
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default, deserialize_with = "tool_result_content")]
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

const TEXT_FIELDS: &[&str] = &["type", "text"];
const TOOL_USE_FIELDS: &[&str] = &["type", "id", "name", "input"];

/// Fields of `raw` outside `known`.
fn extra_fields(raw: &Value, known: &[&str]) -> Map<String, Value> {
    raw.as_object()
        .map(|fields| {
            fields
                .iter()
                .filter(|(key, _)| !known.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn serialize_with_extra<S: Serializer>(
    wire: WireBlock,
    extra: &Map<String, Value>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    if extra.is_empty() {
        return wire.serialize(serializer);
    }
    let mut value = serde_json::to_value(wire).map_err(S::Error::custom)?;
    if let Some(fields) = value.as_object_mut() {
        for (key, field) in extra {
            fields.entry(key.clone()).or_insert_with(|| field.clone());
        }
    }
    value.serialize(serializer)
}

// `tool_result.content` may be a string or a list of text blocks.
fn tool_result_content<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Array(items) => Ok(items
            .iter()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect()),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!(
            "unsupported tool_result content: {}",
            other
        ))),
    }
}

impl Serialize for ContentBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ContentBlock::Text { text, extra } => {
                serialize_with_extra(WireBlock::Text { text: text.clone() }, extra, serializer)
            }
            ContentBlock::ToolUse { id, name, input, extra } => serialize_with_extra(
                WireBlock::ToolUse {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                },
                extra,
                serializer,
            ),
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => WireBlock::ToolResult {
                tool_use_id: tool_use_id.clone(),
                content: content.clone(),
                is_error: *is_error,
            }
            .serialize(serializer),
            ContentBlock::Other(raw) => raw.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let block_type = raw
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| D::Error::missing_field("type"))?;
        if !matches!(block_type, "text" | "tool_use" | "tool_result") {
            return Ok(ContentBlock::Other(raw));
        }
        let wire = WireBlock::deserialize(&raw).map_err(D::Error::custom)?;
        Ok(match wire {
            WireBlock::Text { text } => ContentBlock::Text {
                text,
                extra: extra_fields(&raw, TEXT_FIELDS),
            },
            WireBlock::ToolUse { id, name, input } => ContentBlock::ToolUse {
                id,
                name,
                input,
                extra: extra_fields(&raw, TOOL_USE_FIELDS),
            },
            WireBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            },
        })
    }
}
